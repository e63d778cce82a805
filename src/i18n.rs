// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库，词条位于 locales/*.yml
// 支持中文（默认）和英文
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

use tracing::warn;

/// 默认语言
pub const DEFAULT_LOCALE: &str = "zh-CN";

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 是否存在该语言的词条
pub fn is_supported(locale: &str) -> bool {
    rust_i18n::available_locales!()
        .iter()
        .any(|available| *available == locale)
}

/// 设置语言
///
/// # 返回
/// - false: 不支持的语言，保持原设置
pub fn set_locale(locale: &str) -> bool {
    if !is_supported(locale) {
        warn!(locale = %locale, "不支持的语言，保持 {}", current_locale());
        return false;
    }
    rust_i18n::set_locale(locale);
    true
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use entity_import::i18n::t;
/// let msg = t("import.empty");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数，占位符格式 %{name}）
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    args.iter()
        .fold(rust_i18n::t!(key).to_string(), |text, (k, v)| {
            text.replace(&format!("%{{{}}}", k), v)
        })
}
