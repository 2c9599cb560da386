//! BIFF5/7/8 record-stream primitives.
//!
//! A BIFF stream is a sequence of records, each with a 4-byte header
//! (2-byte opcode + 2-byte body length) followed by the body. CONTINUE
//! records (opcode `0x003C`) extend the body of the preceding record past
//! the 8224-byte per-record limit; nothing in this module merges them
//! eagerly; callers that need a merged body re-enter the stream with
//! [`cursor::ChunkCursor`] (as [`crate::sst::assemble_sst`] and
//! [`crate::reader`]'s FORMULA/STRING lookahead do) rather than paying to
//! materialize every record up front.

pub mod cursor;
pub mod opcode;
pub mod parser;
pub mod records;
pub mod strings;
