use std::env;

use crate::common::{Language, TextDirection};

/// Share of non-whitespace characters that must be Arabic for a text to count
/// as Arabic.
const ARABIC_THRESHOLD: f64 = 0.3;

fn is_arabic(ch: char) -> bool {
    matches!(ch, '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}' | '\u{08A0}'..='\u{08FF}')
}

/// Guess the language of `text`. Empty or whitespace-only text is English.
pub fn detect_language(text: &str) -> Language {
    let mut arabic = 0usize;
    let mut total = 0usize;
    for ch in text.chars().filter(|ch| !ch.is_whitespace()) {
        total += 1;
        if is_arabic(ch) {
            arabic += 1;
        }
    }

    if total > 0 && arabic as f64 / total as f64 > ARABIC_THRESHOLD {
        Language::Ar
    } else {
        Language::En
    }
}

pub fn detect_direction(text: &str) -> TextDirection {
    detect_language(text).direction()
}

/// Language preferred by the desktop session, from the usual locale variables.
pub fn detect_system_language() -> Language {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|key| env::var(key).ok())
        .find(|value| !value.is_empty())
        .map(|locale| language_from_locale(&locale))
        .unwrap_or_default()
}

fn language_from_locale(locale: &str) -> Language {
    if locale.to_ascii_lowercase().starts_with("ar") {
        Language::Ar
    } else {
        Language::En
    }
}

/// Bilingual labels for the strings the UI shows. Unknown keys fall back to
/// the key itself.
pub fn t(key: &str, language: Language) -> &str {
    let pair = match key {
        "welcome" => ("Welcome to Zaki.One", "مرحباً بك في زكي.ون"),
        "subtitle" => (
            "Your AI companion for insightful conversations.",
            "رفيقك الذكي في محادثات ثرية.",
        ),
        "startChat" => ("Start Chatting", "ابدأ الدردشة"),
        "thinking" => ("Zaki is thinking...", "زكي يفكر..."),
        "placeholder" => (
            "Ask Zaki anything you want to know.",
            "اسأل زكي عن أي شيء تريد معرفته.",
        ),
        "send" => ("Send", "إرسال"),
        "settings" => ("Settings", "الإعدادات"),
        "language" => ("Language", "اللغة"),
        "darkMode" => ("Dark mode", "الوضع الداكن"),
        "preInstructions" => (
            "Insert Pre-Instructions For Zaki",
            "أدخل تعليمات مسبقة لزكي",
        ),
        "clearChat" => ("Clear Chat", "مسح الدردشة"),
        "confirmClear" => ("Confirm Clear", "تأكيد المسح"),
        "cancel" => ("Cancel", "إلغاء"),
        "deleted" => ("Chat Cleared!", "تم مسح الدردشة!"),
        "copy" => ("Copy", "نسخ"),
        "copied" => ("Copied!", "تم النسخ!"),
        "copyChat" => ("Copy conversation", "نسخ المحادثة"),
        "home" => ("Home", "الرئيسية"),
        "error" => ("Error", "خطأ"),
        "rateLimited" => (
            "Too many messages. Please wait a moment before sending another message.",
            "رسائل كثيرة جداً. يرجى الانتظار قليلاً قبل إرسال رسالة أخرى.",
        ),
        "noMessages" => ("No messages to share", "لا توجد رسائل للمشاركة"),
        "downloaded" => ("File downloaded successfully", "تم تنزيل الملف بنجاح"),
        "downloadFailed" => ("Failed to save file", "تعذر حفظ الملف"),
        "offlineAssets" => ("Cached assets", "الملفات المخزنة"),
        _ => return key,
    };

    match language {
        Language::En => pair.0,
        Language::Ar => pair.1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_arabic_text() {
        assert_eq!(detect_language("مرحبا كيف حالك"), Language::Ar);
        assert_eq!(detect_direction("مرحبا"), TextDirection::Rtl);
    }

    #[test]
    fn detects_english_and_empty_text() {
        assert_eq!(detect_language("hello there"), Language::En);
        assert_eq!(detect_language(""), Language::En);
        assert_eq!(detect_language("   \n"), Language::En);
    }

    #[test]
    fn mixed_text_uses_thirty_percent_threshold() {
        // 2 Arabic letters out of 8 visible characters = 25%
        assert_eq!(detect_language("abcdef مر"), Language::En);
        // 4 out of 8 = 50%
        assert_eq!(detect_language("abcd مرحب"), Language::Ar);
    }

    #[test]
    fn locale_prefix_selects_language() {
        assert_eq!(language_from_locale("ar_EG.UTF-8"), Language::Ar);
        assert_eq!(language_from_locale("en_US.UTF-8"), Language::En);
        assert_eq!(language_from_locale("C"), Language::En);
    }

    #[test]
    fn labels_fall_back_to_key() {
        assert_eq!(t("send", Language::Ar), "إرسال");
        assert_eq!(t("missing-key", Language::En), "missing-key");
    }
}
