pub mod config;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod policy;
pub mod relax;
pub mod search;

pub use domain::details::{apply, FieldSlot, MemberDelta, MemberDetails};
pub use domain::member::{
    format_price, BaseProductId, CandidatePreview, MemberId, MemberOffer, RankedCandidate,
};
pub use domain::state::{StopReason, TurnState};
pub use errors::{ApplicationError, DomainError};
pub use extract::{Extraction, ExtractionContext, ExtractionIntent, Lexicon, RuleBasedParser};
pub use policy::{
    decide, next_question, normalize_digits, parse_selection, PolicyConfig, SelectionOutcome,
    TurnAction, QUESTION_BANK,
};
pub use relax::{run_ladder, RelaxStep, RelaxationOutcome, LADDER};
pub use search::{
    build_search_result, matches_filters, CatalogQuery, Distributions, PriceBucket, RankingWeights,
    SearchError, SearchResult, WarrantySplit, PRICE_BUCKET_WIDTH,
};
