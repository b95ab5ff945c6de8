/*
[INPUT]:  Bot configuration payloads and local cache storage
[OUTPUT]: Settings model in wire and structured pair forms, freshness cache
[POS]:    Settings layer - exchange/pair configuration, independent of the channel
[UPDATE]: When the config schema, pair conversion, or cache policy changes
*/

pub mod cache;
pub mod model;
pub mod pairs;

pub use cache::{CACHE_TTL_MINUTES, CacheSlots, CacheStore, FileStore, MemoryStore, SettingsCache};
pub use model::{
    ApplyOutcome, ExchangeConfig, PairFormat, PortfolioAddresses, Settings, SmsContact, SmsGlobal,
    WalletAddress, Webserver,
};
pub use pairs::{EnabledMatch, PairEntry, normalize_symbol};
