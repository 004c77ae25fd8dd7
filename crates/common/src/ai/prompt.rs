//! Prompt construction for flashcard generation

use crate::flashcards::types::MAX_CONTENT_CHARS;

/// System instructions sent with every generation request
pub fn system_prompt() -> String {
    format!(
        "You are an assistant that writes study flashcards. \
         Each flashcard has a short question on the front and a concise answer on the back. \
         Keep each side under {} characters. Write in the language of the source text. \
         Respond with JSON only, in the form \
         {{\"flashcards\": [{{\"front\": \"...\", \"back\": \"...\"}}]}}.",
        MAX_CONTENT_CHARS
    )
}

/// User message asking for at most `max_flashcards` cards from `source_text`
pub fn user_prompt(source_text: &str, max_flashcards: u32) -> String {
    format!(
        "Create at most {} flashcards covering the key facts of the text below.\n\n\
         <source>\n{}\n</source>",
        max_flashcards, source_text
    )
}
