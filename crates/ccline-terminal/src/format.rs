//! Number, cost, duration and model-name formatting

const FAMILIES: [(&str, &str); 3] = [("Opus", "Op"), ("Sonnet", "Son"), ("Haiku", "Hai")];

/// `1.5M`, `45.0K`, `500`
pub fn format_token_count(tokens: u64) -> String {
    if tokens >= 1_000_000 {
        format!("{:.1}M", tokens as f64 / 1_000_000.0)
    } else if tokens >= 1_000 {
        format!("{:.1}K", tokens as f64 / 1_000.0)
    } else {
        tokens.to_string()
    }
}

/// Like [`format_token_count`] but drops the decimal from 100 upwards: `332K`, `14.0M`
pub fn format_token_count_short(tokens: u64) -> String {
    let scaled = |value: f64, unit: &str| {
        if value >= 100.0 {
            format!("{}{unit}", value.round() as u64)
        } else {
            format!("{value:.1}{unit}")
        }
    };
    if tokens >= 1_000_000 {
        scaled(tokens as f64 / 1_000_000.0, "M")
    } else if tokens >= 1_000 {
        scaled(tokens as f64 / 1_000.0, "K")
    } else {
        tokens.to_string()
    }
}

/// More decimals for smaller amounts: `$0.0030`, `$0.500`, `$12.34`
pub fn format_cost(cost: f64) -> String {
    if cost < 0.01 {
        format!("${cost:.4}")
    } else if cost < 1.0 {
        format!("${cost:.3}")
    } else {
        format!("${cost:.2}")
    }
}

/// `45s`, `12m`, `2h5m`, `3h`
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        format!("{seconds}s")
    } else if seconds < 3600 {
        format!("{}m", seconds / 60)
    } else {
        let hours = seconds / 3600;
        let minutes = (seconds % 3600) / 60;
        if minutes > 0 {
            format!("{hours}h{minutes}m")
        } else {
            format!("{hours}h")
        }
    }
}

/// Drop the `Claude` prefix and any `(... context)` suffix
///
/// `3.5 Haiku` becomes `Haiku 3.5`. With `tight`, family names are
/// abbreviated and spaces removed: `Claude Opus 4.6` becomes `Op4.6`.
pub fn shorten_model_name(model: &str, tight: bool) -> String {
    let mut name = model.trim();
    if let Some(prefix) = name.get(..7)
        && prefix.eq_ignore_ascii_case("claude ")
    {
        name = name[7..].trim_start();
    }
    if name.ends_with(')')
        && let Some(open) = name.rfind(" (")
        && name[open..].to_ascii_lowercase().contains("context")
    {
        name = name[..open].trim_end();
    }

    let mut name = version_first_to_family_first(name).unwrap_or_else(|| name.to_string());

    if tight {
        for (family, short) in FAMILIES {
            name = replace_ignore_ascii_case(&name, family, short);
        }
        name.retain(|c| c != ' ');
    }
    name
}

fn version_first_to_family_first(name: &str) -> Option<String> {
    let (version, rest) = name.split_once(char::is_whitespace)?;
    if version.is_empty() || !version.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let rest = rest.trim_start();
    FAMILIES.iter().find_map(|(family, _)| {
        rest.get(..family.len())
            .filter(|word| word.eq_ignore_ascii_case(family))
            .map(|word| format!("{word} {version}"))
    })
}

fn replace_ignore_ascii_case(haystack: &str, needle: &str, replacement: &str) -> String {
    let lower = haystack.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;
    for (start, _) in lower.match_indices(&needle) {
        out.push_str(&haystack[last..start]);
        out.push_str(replacement);
        last = start + needle.len();
    }
    out.push_str(&haystack[last..]);
    out
}
