#[cfg(feature = "calamine")]
pub mod calamine;
#[cfg(feature = "json")]
pub mod json;

#[cfg(feature = "calamine")]
pub use calamine::CalamineAdapter;
#[cfg(feature = "json")]
pub use json::JsonAdapter;
