mod gemini;
mod generator;
mod prompts;

pub use gemini::{GeminiClient, GEMINI_API_URL, GEMINI_MODEL};
pub use generator::{GeneratedReport, GenerationError, ReportGenerator};
pub use prompts::PromptTemplates;
