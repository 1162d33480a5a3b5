// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification, retrieval, and relationship engines for Recall.
//!
//! ## Architecture
//!
//! - **CachedEmbedder**: TTL-bounded cache and deadline in front of the embedding adapter
//! - **BucketResolver**: generic reuse / near-duplicate / create resolution for labeled buckets
//! - **CategoryClassifier** / **TagClassifier**: category and tag assignment on top of the resolver
//! - **ProviderOracle**: names new buckets through the utility model
//! - **Summarizer**: titles, summaries, and category descriptions
//! - **Retriever**: network, hybrid (bm25 + semantic via RRF), and semantic search tiers
//! - **GraphBuilder**: similarity edges between memories on save

pub mod bucket;
pub mod category;
pub mod embedder;
pub mod graph;
pub mod llm;
pub mod oracle;
pub mod retriever;
pub mod summarizer;
pub mod tags;
pub mod text;

#[cfg(test)]
mod test_support;

pub use bucket::{Bucket, BucketResolver, BucketStore, Thresholds};
pub use category::{CategoryChoice, CategoryClassifier};
pub use embedder::CachedEmbedder;
pub use graph::GraphBuilder;
pub use llm::UtilityModel;
pub use oracle::{BucketKind, LabelOracle, ProviderOracle};
pub use retriever::{Retriever, SearchHit, SearchOutcome, SearchTier};
pub use summarizer::{Summarizer, TitleSummary};
pub use tags::{TagChoice, TagClassifier, normalize_tag};
