//! Prompt text for script generation and critique

use super::{CritiqueRequest, ScriptRequest};

/// Site copy beyond this many characters is cut before prompting
pub const MAX_SITE_COPY_CHARS: usize = 4000;

pub fn generation_system_prompt() -> &'static str {
    "You write short spoken welcome pitches for websites. The text is read aloud by a \
     text-to-speech voice to a visitor who just landed on the site. Write natural spoken \
     sentences only: no headings, lists, emojis, stage directions, URLs or quotation marks. \
     Reply with the script text and nothing else."
}

pub fn generation_user_prompt(request: &ScriptRequest) -> String {
    let mut prompt = format!(
        "Write a voice pitch for \"{}\" ({}).\n\
         Audience: {}.\n\
         Tone: {} ({}).\n\
         Language: write in the language with tag '{}'.\n\
         Length: at most {} words.",
        request.project_name,
        request.site_url,
        request.condition.audience(),
        request.tone,
        request.tone.guidance(),
        request.language,
        request.max_words,
    );

    if let Some(copy) = request.site_copy.as_deref() {
        prompt.push_str("\n\nUse these facts from the website where they help:\n");
        prompt.push_str(truncate_chars(copy.trim(), MAX_SITE_COPY_CHARS));
    }
    prompt
}

pub fn critique_system_prompt() -> &'static str {
    "You review spoken website pitches. Respond with a JSON object with the keys \
     \"score\" (integer 1-10), \"strengths\" (array of short strings), \"suggestions\" \
     (array of short strings) and \"revisedScript\" (an improved version of the script, \
     or null if it needs no changes)."
}

pub fn critique_user_prompt(request: &CritiqueRequest) -> String {
    let tone = request.tone.unwrap_or_default();
    let language = request.language.as_deref().unwrap_or("en");
    format!(
        "Intended tone: {} ({}).\nLanguage tag: {}.\n\nScript:\n{}",
        tone,
        tone.guidance(),
        language,
        request.script.trim()
    )
}

/// Drop wrapping quotes and whitespace models like to add around the script
pub fn clean_script(raw: &str) -> String {
    const QUOTES: &[char] = &['"', '\'', '“', '”', '‘', '’', '`'];
    raw.trim().trim_matches(QUOTES).trim().to_string()
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
