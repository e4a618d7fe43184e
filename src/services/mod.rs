pub mod fetcher;
pub mod harvester;
pub mod index;
pub mod m3u_parser;
pub mod reconciler;
pub mod sources;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;
