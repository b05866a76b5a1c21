pub mod batch;
pub mod normalize;
pub mod tweet_info;

pub use batch::{process_directory, BatchSummary, FileReport};
pub use normalize::{parse_tweet_entry, MediaItem, ParsedRecord, ParsedTweet};
pub use tweet_info::{extract_tweet_info, TweetInfo};
