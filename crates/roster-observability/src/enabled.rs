use std::sync::OnceLock;

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();

/// Reads `OBSERVABILITY_ENABLED` once. Anything except `false` or `0` enables it.
///
/// Always `false` when the `observability` feature is not compiled in.
pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        cfg!(feature = "observability")
            && std::env::var("OBSERVABILITY_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(true)
    })
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    !(value.eq_ignore_ascii_case("false") || value == "0")
}
