pub mod onlinekhabar;

pub use onlinekhabar::OnlineKhabarScraper;
