pub mod capture;
pub mod site;

#[cfg(test)]
mod tests;

pub use site::crawl;
