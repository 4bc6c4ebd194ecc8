//! # edgepatch-mappers — Suggestion-to-Patch Translation
//!
//! Every content-optimization category ("opportunity type") has its own
//! suggestion payload shape. A mapper knows one shape: it decides whether a
//! suggestion can be deployed at the edge and turns eligible suggestions into
//! [`Patch`](edgepatch_core::Patch)es.
//!
//! ## Built-in Mappers
//!
//! | Opportunity type | Mapper | Prerender |
//! |------------------|--------|-----------|
//! | `headings` | [`HeadingsMapper`] | no |
//! | `readability` | [`ReadabilityMapper`] | yes |
//! | `faq` | [`FaqMapper`] | yes |
//! | `content-summarization` | [`SummarizationMapper`] | yes |
//! | `table-of-contents` | [`TocMapper`] | yes |
//! | `generic` | [`GenericMapper`] | no |
//!
//! ## Registry
//!
//! [`MapperRegistry`] is plain owned state. Construct one per engine (or per
//! test) and register overrides before traffic starts; registration is
//! last-write-wins per opportunity type.

pub mod faq;
pub mod generic;
pub mod headings;
pub(crate) mod markdown;
pub mod mapper;
pub mod readability;
pub mod registry;
pub mod summarization;
pub mod toc;

pub use faq::FaqMapper;
pub use generic::GenericMapper;
pub use headings::HeadingsMapper;
pub use mapper::OpportunityMapper;
pub use readability::ReadabilityMapper;
pub use registry::MapperRegistry;
pub use summarization::SummarizationMapper;
pub use toc::TocMapper;
