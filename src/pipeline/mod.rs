//! Pipeline stages from uploaded document to listed artifacts.
//!
//! Each submodule implements exactly one stage and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ steps ──▶ runner ──▶ artifacts
//! (URL/path)  (lopdf)   (prompts)  (engine)   (re-scan + reader)
//! ```
//!
//! 1. [`input`]     canonicalise the user-supplied path or URL to a local file
//!    and reject anything that is not a PDF
//! 2. [`extract`]   per-page text extraction; a failing page is recorded, not fatal
//! 3. [`steps`]     build the ordered step definitions from the document text
//! 4. [`runner`]    hand the step list to the engine in one call and record
//!    the outcome
//! 5. [`artifacts`] scan the output directories and read each file back
//!    through [`reader`]

pub mod artifacts;
pub mod extract;
pub mod input;
pub mod reader;
pub mod runner;
pub mod steps;
