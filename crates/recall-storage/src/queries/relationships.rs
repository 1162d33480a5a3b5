// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Undirected memory relationship edges.
//!
//! Each pair is stored once with `memory_a < memory_b`; upserts normalize
//! the order so callers may pass either.

use recall_core::{MemoryRelationship, RecallError};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::relationship_from_row;

/// Insert an edge or refresh the score and type of the existing one.
pub async fn upsert_relationship(
    db: &Database,
    relationship: &MemoryRelationship,
) -> Result<(), RecallError> {
    let mut r = relationship.clone();
    if r.memory_a == r.memory_b {
        return Err(RecallError::Validation(format!(
            "memory {} cannot relate to itself",
            r.memory_a
        )));
    }
    if r.memory_a > r.memory_b {
        std::mem::swap(&mut r.memory_a, &mut r.memory_b);
    }
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO memory_relationships (id, owner_id, memory_a, memory_b, score,
                    relationship_type, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (owner_id, memory_a, memory_b) DO UPDATE SET
                    score = excluded.score,
                    relationship_type = excluded.relationship_type,
                    updated_at = excluded.updated_at",
                params![
                    r.id,
                    r.owner_id,
                    r.memory_a,
                    r.memory_b,
                    f64::from(r.score),
                    r.relationship_type,
                    r.created_at,
                    r.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Edges touching `memory_id` where both endpoints are live, strongest first.
pub async fn relationships_for(
    db: &Database,
    owner_id: &str,
    memory_id: &str,
) -> Result<Vec<MemoryRelationship>, RecallError> {
    let owner_id = owner_id.to_string();
    let memory_id = memory_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<MemoryRelationship>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.owner_id, r.memory_a, r.memory_b, r.score, r.relationship_type,
                        r.created_at, r.updated_at
                 FROM memory_relationships r
                 JOIN memories ma ON ma.id = r.memory_a AND ma.deleted_at IS NULL
                 JOIN memories mb ON mb.id = r.memory_b AND mb.deleted_at IS NULL
                 WHERE r.owner_id = ?1 AND (r.memory_a = ?2 OR r.memory_b = ?2)
                 ORDER BY r.score DESC",
            )?;
            stmt.query_map(params![owner_id, memory_id], relationship_from_row)?
                .collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::memories::{insert_memory, soft_delete_memory};
    use crate::queries::test_support::{memory, setup_db};

    fn edge(id: &str, a: &str, b: &str, score: f32) -> MemoryRelationship {
        MemoryRelationship {
            id: id.to_string(),
            owner_id: "alice".to_string(),
            memory_a: a.to_string(),
            memory_b: b.to_string(),
            score,
            relationship_type: "related".to_string(),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    async fn seed(db: &Database) {
        for id in ["m1", "m2", "m3"] {
            insert_memory(db, &memory(id, "alice", id, vec![1.0]))
                .await
                .expect("insert");
        }
    }

    #[tokio::test]
    async fn either_order_yields_one_edge() {
        let (db, _dir) = setup_db().await;
        seed(&db).await;
        upsert_relationship(&db, &edge("r1", "m1", "m2", 0.6)).await.expect("upsert");
        upsert_relationship(&db, &edge("r2", "m2", "m1", 0.9)).await.expect("upsert");

        let edges = relationships_for(&db, "alice", "m1").await.expect("edges");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].memory_a, "m1");
        assert_eq!(edges[0].memory_b, "m2");
        assert!((edges[0].score - 0.9).abs() < 1e-6);
        assert_eq!(edges[0].id, "r1");
    }

    #[tokio::test]
    async fn self_loops_are_rejected() {
        let (db, _dir) = setup_db().await;
        seed(&db).await;
        let err = upsert_relationship(&db, &edge("r1", "m1", "m1", 1.0))
            .await
            .expect_err("self loop");
        assert!(matches!(err, RecallError::Validation(_)));
    }

    #[tokio::test]
    async fn deleted_endpoints_are_hidden() {
        let (db, _dir) = setup_db().await;
        seed(&db).await;
        upsert_relationship(&db, &edge("r1", "m1", "m2", 0.7)).await.expect("upsert");
        upsert_relationship(&db, &edge("r2", "m1", "m3", 0.8)).await.expect("upsert");

        let edges = relationships_for(&db, "alice", "m1").await.expect("edges");
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].other_end("m1"), Some("m3"));

        soft_delete_memory(&db, "alice", "m3").await.expect("delete");
        let edges = relationships_for(&db, "alice", "m1").await.expect("edges");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].other_end("m1"), Some("m2"));
    }
}
