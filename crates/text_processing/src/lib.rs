//! Text processing for interviewer replies
//!
//! - [`protocol`]: splits a raw reply into prose and validated exhibits
//! - [`segmenter`]: splits prose into speakable sentences
//!
//! # Example
//!
//! ```ignore
//! use mock_interview_text_processing::{ReplyParser, segment_sentences};
//!
//! let parser = ReplyParser::default();
//! let parsed = parser.parse(r#"<EXHIBIT>{"title":"Costs","type":"table","data":[]}</EXHIBIT> Take a look. What stands out?"#);
//!
//! assert_eq!(parsed.exhibits.len(), 1);
//! assert_eq!(segment_sentences(&parsed.prose), vec!["Take a look.", "What stands out?"]);
//! ```

pub mod protocol;
pub mod segmenter;

pub use protocol::{ExhibitIdAllocator, ExhibitRejection, ParsedReply, ReplyParser};
pub use segmenter::segment_sentences;
