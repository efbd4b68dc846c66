//! Operations on the `species` catalog table.

use sqlx::PgPool;
use uuid::Uuid;

use biosurvey_types::{ConservationStatus, Species, SpeciesId};

use crate::error::DbError;

/// Operations on the `species` table.
pub struct SpeciesStore<'a> {
    pool: &'a PgPool,
}

impl<'a> SpeciesStore<'a> {
    /// Create a new species store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load catalog entries by id; unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query or a row conversion fails.
    pub async fn get_many(&self, ids: &[SpeciesId]) -> Result<Vec<Species>, DbError> {
        let raw: Vec<Uuid> = ids.iter().map(|id| id.into_inner()).collect();
        let rows = sqlx::query_as::<_, SpeciesRow>(
            r"SELECT id, scientific_name, common_name, family, genus, species_code, conservation_status
              FROM species
              WHERE id = ANY($1)
              ORDER BY scientific_name",
        )
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Species::try_from).collect()
    }

    /// Insert a catalog entry.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, species: &Species) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO species (id, scientific_name, common_name, family, genus, species_code, conservation_status)
              VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(species.id.into_inner())
        .bind(&species.scientific_name)
        .bind(&species.common_name)
        .bind(species.family.as_deref())
        .bind(species.genus.as_deref())
        .bind(species.species_code.as_deref())
        .bind(species.conservation_status.map(ConservationStatus::code))
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

/// A row from the `species` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SpeciesRow {
    /// Species UUID.
    pub id: Uuid,
    /// Binomial name.
    pub scientific_name: String,
    /// Vernacular name.
    pub common_name: String,
    /// Family.
    pub family: Option<String>,
    /// Genus.
    pub genus: Option<String>,
    /// Field code.
    pub species_code: Option<String>,
    /// IUCN code as stored.
    pub conservation_status: Option<String>,
}

impl TryFrom<SpeciesRow> for Species {
    type Error = DbError;

    fn try_from(row: SpeciesRow) -> Result<Self, Self::Error> {
        let conservation_status = row
            .conservation_status
            .as_deref()
            .map(|code| {
                code.parse::<ConservationStatus>().map_err(|e| DbError::InvalidColumn {
                    column: "species.conservation_status",
                    value: e.value,
                })
            })
            .transpose()?;
        Ok(Self {
            id: SpeciesId::from(row.id),
            scientific_name: row.scientific_name,
            common_name: row.common_name,
            family: row.family,
            genus: row.genus,
            species_code: row.species_code,
            conservation_status,
        })
    }
}
