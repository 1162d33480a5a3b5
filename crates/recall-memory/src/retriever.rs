// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tiered memory retrieval.
//!
//! When related memories are requested, tiers run in order and the first
//! non-empty one answers:
//!
//! 1. network: direct semantic matches expanded up to two hops through the
//!    relationship graph;
//! 2. hybrid: FTS5 bm25 ranking fused with semantic ranking by weighted
//!    Reciprocal Rank Fusion;
//! 3. semantic: plain top-K cosine similarity.
//!
//! Plain searches go straight to the semantic tier.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use recall_config::model::RetrievalConfig;
use recall_core::{Memory, RecallError, StorageAdapter};
use serde::Serialize;
use strum::Display;
use tracing::{debug, warn};

use crate::embedder::CachedEmbedder;
use crate::text::preview;

/// Hops followed from a direct match.
const MAX_GRAPH_DEGREE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SearchTier {
    Network,
    Hybrid,
    Semantic,
}

/// One retrieved memory with the scores of the tier that found it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub content_preview: String,
    pub score: f32,
    pub tier: SearchTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph_degree: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rrf_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_rank: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_rank: Option<usize>,
}

/// Hits plus the tier that produced them. An empty result reports the last
/// tier tried.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub tier: SearchTier,
    pub hits: Vec<SearchHit>,
}

/// Weights for [`reciprocal_rank_fusion`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub keyword: f32,
    pub semantic: f32,
    pub k: f32,
}

/// One fused candidate. Ranks are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct FusedRank {
    pub id: String,
    pub score: f32,
    pub keyword_rank: Option<usize>,
    pub semantic_rank: Option<usize>,
}

/// Weighted Reciprocal Rank Fusion of two ranked id lists.
///
/// `score(d) = w_kw / (k + rank_kw(d)) + w_sem / (k + rank_sem(d))`, with a
/// list contributing nothing for documents it does not contain. Output is
/// sorted by score descending, ties broken by id.
pub fn reciprocal_rank_fusion(
    keyword: &[String],
    semantic: &[String],
    weights: FusionWeights,
) -> Vec<FusedRank> {
    let mut fused: HashMap<&str, FusedRank> = HashMap::new();

    for (i, id) in keyword.iter().enumerate() {
        let rank = i + 1;
        let entry = fused.entry(id).or_insert_with(|| FusedRank {
            id: id.clone(),
            score: 0.0,
            keyword_rank: None,
            semantic_rank: None,
        });
        if entry.keyword_rank.is_none() {
            entry.keyword_rank = Some(rank);
            entry.score += weights.keyword / (weights.k + rank as f32);
        }
    }
    for (i, id) in semantic.iter().enumerate() {
        let rank = i + 1;
        let entry = fused.entry(id).or_insert_with(|| FusedRank {
            id: id.clone(),
            score: 0.0,
            keyword_rank: None,
            semantic_rank: None,
        });
        if entry.semantic_rank.is_none() {
            entry.semantic_rank = Some(rank);
            entry.score += weights.semantic / (weights.k + rank as f32);
        }
    }

    let mut out: Vec<FusedRank> = fused.into_values().collect();
    out.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
    out
}

struct NetworkNode {
    id: String,
    relevance: f32,
    degree: u8,
    similarity: Option<f32>,
}

pub struct Retriever {
    storage: Arc<dyn StorageAdapter>,
    embedder: Arc<CachedEmbedder>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        embedder: Arc<CachedEmbedder>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            storage,
            embedder,
            config,
        }
    }

    /// Search the owner's memories.
    ///
    /// With `include_related` the network, hybrid, and semantic tiers run in
    /// turn until one returns something. Without it only the semantic tier
    /// runs. If the query cannot be embedded, only keyword ranking runs.
    pub async fn search(
        &self,
        owner_id: &str,
        query: &str,
        limit: usize,
        include_related: bool,
    ) -> Result<SearchOutcome, RecallError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RecallError::Validation("search query is empty".into()));
        }
        let limit = limit.max(1);

        let embedding = match self.embedder.embed(query).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!(owner_id, error = %e, "query embedding failed, keyword search only");
                None
            }
        };

        if let (true, Some(embedding)) = (include_related, &embedding) {
            let hits = self.network_search(owner_id, embedding, limit).await?;
            if !hits.is_empty() {
                debug!(owner_id, count = hits.len(), "network tier answered");
                return Ok(SearchOutcome {
                    tier: SearchTier::Network,
                    hits,
                });
            }
        }

        if include_related || embedding.is_none() {
            let hits = self
                .hybrid_search(owner_id, query, embedding.as_deref(), limit)
                .await?;
            if !hits.is_empty() || embedding.is_none() {
                debug!(owner_id, count = hits.len(), "hybrid tier answered");
                return Ok(SearchOutcome {
                    tier: SearchTier::Hybrid,
                    hits,
                });
            }
        }

        let hits = match &embedding {
            Some(embedding) => self.semantic_search(owner_id, embedding, limit).await?,
            None => Vec::new(),
        };
        debug!(owner_id, count = hits.len(), "semantic tier answered");
        Ok(SearchOutcome {
            tier: SearchTier::Semantic,
            hits,
        })
    }

    /// Direct matches at the network floor, expanded breadth-first through
    /// relationship edges at or above the same floor.
    pub async fn network_search(
        &self,
        owner_id: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, RecallError> {
        let floor = self.config.network_similarity_floor;
        let direct = self.nearest(owner_id, embedding, limit, floor, None).await?;
        if direct.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen: HashSet<String> = direct.iter().map(|(id, _)| id.clone()).collect();
        let mut nodes: Vec<NetworkNode> = direct
            .into_iter()
            .map(|(id, similarity)| NetworkNode {
                id,
                relevance: similarity,
                degree: 0,
                similarity: Some(similarity),
            })
            .collect();

        let mut frontier: Vec<(String, f32)> =
            nodes.iter().map(|n| (n.id.clone(), n.relevance)).collect();
        let mut expanded = 0usize;
        'hops: for degree in 1..=MAX_GRAPH_DEGREE {
            let mut next = Vec::new();
            for (parent, parent_relevance) in &frontier {
                let edges = self.storage.relationships_for(owner_id, parent).await?;
                for edge in edges.iter().filter(|e| e.score >= floor) {
                    let Some(other) = edge.other_end(parent) else {
                        continue;
                    };
                    if !seen.insert(other.to_string()) {
                        continue;
                    }
                    if expanded >= self.config.network_max_neighbors {
                        break 'hops;
                    }
                    expanded += 1;
                    let relevance = parent_relevance * edge.score;
                    nodes.push(NetworkNode {
                        id: other.to_string(),
                        relevance,
                        degree,
                        similarity: None,
                    });
                    next.push((other.to_string(), relevance));
                }
            }
            frontier = next;
        }

        nodes.sort_by(|a, b| {
            b.relevance
                .total_cmp(&a.relevance)
                .then_with(|| a.degree.cmp(&b.degree))
        });
        nodes.truncate(limit);

        let ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
        let memories = self.hydrate(owner_id, &ids).await?;
        Ok(nodes
            .into_iter()
            .filter_map(|node| {
                let memory = memories.get(&node.id)?;
                Some(SearchHit {
                    similarity: node.similarity,
                    graph_degree: Some(node.degree),
                    ..self.hit(memory, node.relevance, SearchTier::Network)
                })
            })
            .collect())
    }

    /// Keyword and semantic rankings fused by weighted RRF. Keyword failures
    /// (for example an FTS syntax error) leave only the semantic list.
    pub async fn hybrid_search(
        &self,
        owner_id: &str,
        query: &str,
        embedding: Option<&[f32]>,
        limit: usize,
    ) -> Result<Vec<SearchHit>, RecallError> {
        let pool = self.config.candidate_pool.max(limit);
        let keyword: Vec<String> = match self.storage.search_keyword(owner_id, query, pool).await {
            Ok(ranked) => ranked.into_iter().map(|(id, _)| id).collect(),
            Err(e) => {
                warn!(owner_id, error = %e, "keyword search failed");
                Vec::new()
            }
        };
        let semantic: Vec<(String, f32)> = match embedding {
            Some(embedding) => {
                self.storage
                    .search_similar(owner_id, embedding, pool, self.config.match_threshold, None)
                    .await?
            }
            None => Vec::new(),
        };
        let similarity: HashMap<&str, f32> =
            semantic.iter().map(|(id, s)| (id.as_str(), *s)).collect();
        let semantic_ids: Vec<String> = semantic.iter().map(|(id, _)| id.clone()).collect();

        let mut fused = reciprocal_rank_fusion(
            &keyword,
            &semantic_ids,
            FusionWeights {
                keyword: self.config.hybrid_keyword_weight,
                semantic: self.config.hybrid_semantic_weight,
                k: self.config.rrf_k,
            },
        );
        fused.retain(|f| f.score >= self.config.hybrid_min_score);
        fused.truncate(limit);

        let ids: Vec<String> = fused.iter().map(|f| f.id.clone()).collect();
        let memories = self.hydrate(owner_id, &ids).await?;
        Ok(fused
            .into_iter()
            .filter_map(|f| {
                let memory = memories.get(&f.id)?;
                Some(SearchHit {
                    similarity: similarity.get(f.id.as_str()).copied(),
                    rrf_score: Some(f.score),
                    keyword_rank: f.keyword_rank,
                    semantic_rank: f.semantic_rank,
                    ..self.hit(memory, f.score, SearchTier::Hybrid)
                })
            })
            .collect())
    }

    /// Top-K by cosine similarity at or above the match threshold.
    pub async fn semantic_search(
        &self,
        owner_id: &str,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, RecallError> {
        let ranked = self
            .nearest(owner_id, embedding, limit, self.config.match_threshold, None)
            .await?;
        let ids: Vec<String> = ranked.iter().map(|(id, _)| id.clone()).collect();
        let memories = self.hydrate(owner_id, &ids).await?;
        Ok(ranked
            .into_iter()
            .enumerate()
            .filter_map(|(i, (id, score))| {
                let memory = memories.get(&id)?;
                Some(SearchHit {
                    similarity: Some(score),
                    semantic_rank: Some(i + 1),
                    ..self.hit(memory, score, SearchTier::Semantic)
                })
            })
            .collect())
    }

    /// Semantic ranking as `(id, similarity)` pairs at or above `floor`,
    /// best first. `exclude_id` keeps a memory out of its own neighbors.
    pub async fn nearest(
        &self,
        owner_id: &str,
        embedding: &[f32],
        limit: usize,
        floor: f32,
        exclude_id: Option<&str>,
    ) -> Result<Vec<(String, f32)>, RecallError> {
        if limit == 0 || embedding.is_empty() {
            return Ok(Vec::new());
        }
        let mut ranked = self
            .storage
            .search_similar(owner_id, embedding, limit, floor, exclude_id)
            .await?;
        if let Some(excluded) = exclude_id {
            ranked.retain(|(id, _)| id != excluded);
        }
        Ok(ranked)
    }

    async fn hydrate(
        &self,
        owner_id: &str,
        ids: &[String],
    ) -> Result<HashMap<String, Memory>, RecallError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let memories = self.storage.get_memories_by_ids(owner_id, ids).await?;
        Ok(memories.into_iter().map(|m| (m.id.clone(), m)).collect())
    }

    fn hit(&self, memory: &Memory, score: f32, tier: SearchTier) -> SearchHit {
        SearchHit {
            id: memory.id.clone(),
            title: memory.title.clone(),
            content_preview: preview(&memory.content, self.config.preview_chars),
            score,
            tier,
            similarity: None,
            graph_degree: None,
            rrf_score: None,
            keyword_rank: None,
            semantic_rank: None,
        }
    }
}
