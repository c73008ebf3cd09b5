use serde::Serialize;
use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Profiles the demo dataset guarantees, one per seeded row.
const SEED_PROFILES: &[SeedProfileContract] = &[
    SeedProfileContract {
        table: "lecturer",
        id: "LEC-0001",
        user_id: "lecturer-1",
        description: "Computer Science lecturer at 250.00 per hour",
    },
    SeedProfileContract {
        table: "lecturer",
        id: "LEC-0002",
        user_id: "lecturer-2",
        description: "Mathematics lecturer at 180.00 per hour",
    },
    SeedProfileContract {
        table: "coordinator",
        id: "PC-0001",
        user_id: "coordinator-1",
        description: "Programme coordinator, Computer Science",
    },
    SeedProfileContract {
        table: "manager",
        id: "AM-0001",
        user_id: "manager-1",
        description: "Academic manager, Faculty of Science",
    },
];

/// Demo lecturer, coordinator, and manager profiles for local runs and smoke tests.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed.sql");

    /// Loads the dataset. Rows that already exist are left alone.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let profiles_seeded = SEED_PROFILES
            .iter()
            .map(|profile| SeedProfileInfo {
                kind: profile.table,
                user_id: profile.user_id,
                description: profile.description,
            })
            .collect();

        Ok(SeedResult { profiles_seeded })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for profile in SEED_PROFILES {
            let present: i64 = sqlx::query_scalar(&format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1 AND user_id = ?2 AND active = 1)",
                profile.table
            ))
            .bind(profile.id)
            .bind(profile.user_id)
            .fetch_one(pool)
            .await?;
            checks.push((profile.id, present == 1));
        }

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the seeded profiles along with any claims filed by the seeded lecturers.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let lecturer_ids = sql_array_from_ids(&ids_in("lecturer"));
        sqlx::query(&format!("DELETE FROM claim WHERE lecturer_id IN {lecturer_ids}"))
            .execute(&mut *tx)
            .await?;
        for table in ["lecturer", "coordinator", "manager"] {
            let ids = sql_array_from_ids(&ids_in(table));
            sqlx::query(&format!("DELETE FROM {table} WHERE id IN {ids}"))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedProfileContract {
    table: &'static str,
    id: &'static str,
    user_id: &'static str,
    description: &'static str,
}

fn ids_in(table: &str) -> Vec<&'static str> {
    SEED_PROFILES.iter().filter(|profile| profile.table == table).map(|p| p.id).collect()
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug, Serialize)]
pub struct SeedResult {
    pub profiles_seeded: Vec<SeedProfileInfo>,
}

#[derive(Debug, Serialize)]
pub struct SeedProfileInfo {
    pub kind: &'static str,
    pub user_id: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
