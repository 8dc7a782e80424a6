//! Prompts for the LLM-backed adapters.
//!
//! Kept in one place so tests can inspect them without a live provider.
//! Callers can override both through the adapter builders.

/// System prompt for transcribing a scanned page with a vision LLM.
///
/// Plain text, not Markdown: the merged output is fed to a translator and
/// read by people, so layout markup would only get in the way.
pub const OCR_SYSTEM_PROMPT: &str =
    r#"You are a careful transcriber of scanned documents, including handwritten letters.

Transcribe the page image exactly:

1. Preserve ALL text in reading order, in the original language. Do not translate.
2. Keep line breaks between paragraphs. Join words hyphenated across line ends only when certain.
3. Write illegible words as [illegible]. Never guess names, dates or numbers.
4. Ignore stamps, page numbers and decorative elements unless they carry text that
   belongs to the letter.
5. Output ONLY the transcribed text. No commentary, no Markdown, no code fences."#;

/// Build the system prompt for translating into `target_lang`.
pub fn translation_system_prompt(source_lang: Option<&str>, target_lang: &str) -> String {
    let source = match source_lang {
        Some(lang) => format!("from the language with code '{lang}' "),
        None => String::new(),
    };
    format!(
        "You are a professional translator. Translate the user's text {source}into the language \
with code '{target_lang}'.\n\
Preserve paragraph breaks and the tone of the original. Keep personal names, place names and \
dates unchanged. Mark unreadable passages such as [illegible] as they are.\n\
Output ONLY the translation, with no commentary."
    )
}

/// Build the system prompt for summarising a document in `target_lang`.
pub fn summary_system_prompt(target_lang: &str) -> String {
    format!(
        "You write short, factual descriptions of scanned historical documents such as \
letters.\n\
Describe, in one paragraph written in the language with code '{target_lang}':\n\
1. WHO writes to whom, and their relationship if it is apparent.\n\
2. NATURE: what kind of document it is (personal letter, business correspondence, \
official record).\n\
3. TOPICS discussed.\n\
4. CONTEXT: dates, places and events mentioned.\n\
Never invent names, dates or places that are not in the text. Output ONLY the paragraph."
    )
}
