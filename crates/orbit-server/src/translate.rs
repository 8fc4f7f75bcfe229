//! Phrase-table translation stub.

/// `(from, to, [(source phrase, replacement)])`
const PHRASES: &[(&str, &str, &[(&str, &str)])] = &[
    ("ja", "en", &[("こんにちは", "Hello"), ("ありがとう", "Thank you")]),
    ("ja", "zh", &[("こんにちは", "你好"), ("ありがとう", "谢谢")]),
    ("ja", "ko", &[("こんにちは", "안녕하세요"), ("ありがとう", "감사합니다")]),
    ("en", "ja", &[("Hello", "こんにちは"), ("Thank you", "ありがとう")]),
    ("en", "zh", &[("Hello", "你好"), ("Thank you", "谢谢")]),
    ("en", "ko", &[("Hello", "안녕하세요"), ("Thank you", "감사합니다")]),
];

/// Replace known phrases for a supported pair. An unsupported pair, or a
/// replacement that comes out empty, tags the text with the target language.
pub fn translate(text: &str, from: &str, to: &str) -> String {
    let replaced = PHRASES
        .iter()
        .find(|(f, t, _)| *f == from && *t == to)
        .map(|(_, _, table)| {
            table
                .iter()
                .fold(text.to_string(), |acc, (src, dst)| acc.replace(src, dst))
        });

    match replaced {
        Some(out) if !out.is_empty() => out,
        _ => format!("[{to}] {text}"),
    }
}
