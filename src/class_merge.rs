//! Utility-Class Conflict Resolution
//!
//! Merges two utility class strings so that a class in the overlay supersedes
//! every base class governing the same CSS property family under the same
//! modifier chain. Classes the table does not know only conflict with an
//! identical class.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

// ═══════════════════════════════════════════════════════════════════════════════
// FAMILY TABLE
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    /// Ordered: the first matching pattern decides the family, so narrow
    /// patterns precede the catch-alls of the same prefix.
    static ref FAMILY_TABLE: Vec<(Regex, &'static str)> = {
        let rules: &[(&str, &str)] = &[
            (r"^(block|inline-block|inline|flex|inline-flex|table|inline-table|table-caption|table-cell|table-column|table-column-group|table-footer-group|table-header-group|table-row-group|table-row|flow-root|grid|inline-grid|contents|list-item|hidden)$", "display"),
            (r"^(static|fixed|absolute|relative|sticky)$", "position"),
            (r"^(visible|invisible|collapse)$", "visibility"),
            (r"^(uppercase|lowercase|capitalize|normal-case)$", "text-transform"),
            (r"^(underline|overline|line-through|no-underline)$", "text-decoration"),
            (r"^(italic|not-italic)$", "font-style"),
            // sizing
            (r"^size-.+$", "size"),
            (r"^min-w-.+$", "min-w"),
            (r"^max-w-.+$", "max-w"),
            (r"^w-.+$", "w"),
            (r"^min-h-.+$", "min-h"),
            (r"^max-h-.+$", "max-h"),
            (r"^h-.+$", "h"),
            // spacing
            (r"^p-.+$", "p"),
            (r"^px-.+$", "px"),
            (r"^py-.+$", "py"),
            (r"^ps-.+$", "ps"),
            (r"^pe-.+$", "pe"),
            (r"^pt-.+$", "pt"),
            (r"^pr-.+$", "pr"),
            (r"^pb-.+$", "pb"),
            (r"^pl-.+$", "pl"),
            (r"^m-.+$", "m"),
            (r"^mx-.+$", "mx"),
            (r"^my-.+$", "my"),
            (r"^ms-.+$", "ms"),
            (r"^me-.+$", "me"),
            (r"^mt-.+$", "mt"),
            (r"^mr-.+$", "mr"),
            (r"^mb-.+$", "mb"),
            (r"^ml-.+$", "ml"),
            (r"^space-x-.+$", "space-x"),
            (r"^space-y-.+$", "space-y"),
            (r"^gap-x-.+$", "gap-x"),
            (r"^gap-y-.+$", "gap-y"),
            (r"^gap-.+$", "gap"),
            // placement
            (r"^inset-x-.+$", "inset-x"),
            (r"^inset-y-.+$", "inset-y"),
            (r"^inset-.+$", "inset"),
            (r"^top-.+$", "top"),
            (r"^right-.+$", "right"),
            (r"^bottom-.+$", "bottom"),
            (r"^left-.+$", "left"),
            (r"^start-.+$", "start"),
            (r"^end-.+$", "end"),
            (r"^z-.+$", "z"),
            (r"^opacity-.+$", "opacity"),
            // typography
            (r"^text-(left|center|right|justify|start|end)$", "text-align"),
            (r"^text-(ellipsis|clip)$", "text-overflow"),
            (r"^text-(wrap|nowrap|balance|pretty)$", "text-wrap"),
            (r"^text-(xs|sm|base|lg|\d*xl)(/.+)?$", "font-size"),
            (r"^text-\[\d[^\]]*\]$", "font-size"),
            (r"^text-.+$", "text-color"),
            (r"^font-(thin|extralight|light|normal|medium|semibold|bold|extrabold|black|\d+|\[\d+\])$", "font-weight"),
            (r"^font-.+$", "font-family"),
            (r"^leading-.+$", "leading"),
            (r"^tracking-.+$", "tracking"),
            // backgrounds
            (r"^bg-(fixed|local|scroll)$", "bg-attachment"),
            (r"^bg-(auto|cover|contain)$", "bg-size"),
            (r"^bg-(repeat|no-repeat|repeat-x|repeat-y|repeat-round|repeat-space)$", "bg-repeat"),
            (r"^bg-(bottom|center|left|left-bottom|left-top|right|right-bottom|right-top|top)$", "bg-position"),
            (r"^bg-(none|gradient-to-.+)$", "bg-image"),
            (r"^bg-.+$", "bg-color"),
            // borders
            (r"^border(-\d+|-\[\d[^\]]*\])?$", "border-w"),
            (r"^border-x(-\d+)?$", "border-w-x"),
            (r"^border-y(-\d+)?$", "border-w-y"),
            (r"^border-t(-\d+)?$", "border-w-t"),
            (r"^border-r(-\d+)?$", "border-w-r"),
            (r"^border-b(-\d+)?$", "border-w-b"),
            (r"^border-l(-\d+)?$", "border-w-l"),
            (r"^border-(solid|dashed|dotted|double|hidden|none)$", "border-style"),
            (r"^border-.+$", "border-color"),
            (r"^rounded(-(none|sm|md|lg|xl|2xl|3xl|full|\[.+\]))?$", "rounded"),
            (r"^rounded-tl(-.+)?$", "rounded-tl"),
            (r"^rounded-tr(-.+)?$", "rounded-tr"),
            (r"^rounded-br(-.+)?$", "rounded-br"),
            (r"^rounded-bl(-.+)?$", "rounded-bl"),
            (r"^rounded-t(-.+)?$", "rounded-t"),
            (r"^rounded-r(-.+)?$", "rounded-r"),
            (r"^rounded-b(-.+)?$", "rounded-b"),
            (r"^rounded-l(-.+)?$", "rounded-l"),
            (r"^ring(-\d+|-inset)?$", "ring-w"),
            (r"^ring-offset-\d+$", "ring-offset-w"),
            (r"^ring-offset-.+$", "ring-offset-color"),
            (r"^ring-.+$", "ring-color"),
            (r"^shadow(-(sm|md|lg|xl|2xl|inner|none))?$", "shadow"),
            (r"^shadow-.+$", "shadow-color"),
            // flexbox & grid
            (r"^flex-(row|row-reverse|col|col-reverse)$", "flex-direction"),
            (r"^flex-(wrap|wrap-reverse|nowrap)$", "flex-wrap"),
            (r"^(grow|flex-grow)(-.+)?$", "grow"),
            (r"^(shrink|flex-shrink)(-.+)?$", "shrink"),
            (r"^flex-.+$", "flex"),
            (r"^basis-.+$", "basis"),
            (r"^order-.+$", "order"),
            (r"^grid-cols-.+$", "grid-cols"),
            (r"^grid-rows-.+$", "grid-rows"),
            (r"^col-span-.+$", "col-span"),
            (r"^row-span-.+$", "row-span"),
            (r"^justify-items-.+$", "justify-items"),
            (r"^justify-self-.+$", "justify-self"),
            (r"^justify-.+$", "justify-content"),
            (r"^items-.+$", "align-items"),
            (r"^self-.+$", "align-self"),
            (r"^content-.+$", "align-content"),
            // interactivity & effects
            (r"^cursor-.+$", "cursor"),
            (r"^select-.+$", "user-select"),
            (r"^pointer-events-.+$", "pointer-events"),
            (r"^overflow-x-.+$", "overflow-x"),
            (r"^overflow-y-.+$", "overflow-y"),
            (r"^overflow-.+$", "overflow"),
            (r"^object-(contain|cover|fill|none|scale-down)$", "object-fit"),
            (r"^transition(-.+)?$", "transition"),
            (r"^duration-.+$", "duration"),
            (r"^ease-.+$", "ease"),
            (r"^fill-.+$", "fill"),
            (r"^stroke-\d+$", "stroke-w"),
            (r"^stroke-.+$", "stroke"),
        ];
        rules
            .iter()
            .map(|(pattern, family)| (Regex::new(pattern).unwrap(), *family))
            .collect()
    };

    static ref ARBITRARY_PROPERTY_RE: Regex = Regex::new(r"^\[([a-zA-Z-]+):.+\]$").unwrap();
}

/// Families that a class of the key family also overrides.
fn subsumed(family: &str) -> &'static [&'static str] {
    match family {
        "p" => &["px", "py", "ps", "pe", "pt", "pr", "pb", "pl"],
        "px" => &["pr", "pl", "ps", "pe"],
        "py" => &["pt", "pb"],
        "m" => &["mx", "my", "ms", "me", "mt", "mr", "mb", "ml"],
        "mx" => &["mr", "ml", "ms", "me"],
        "my" => &["mt", "mb"],
        "gap" => &["gap-x", "gap-y"],
        "size" => &["w", "h"],
        "inset" => &["inset-x", "inset-y", "top", "right", "bottom", "left", "start", "end"],
        "inset-x" => &["left", "right", "start", "end"],
        "inset-y" => &["top", "bottom"],
        "overflow" => &["overflow-x", "overflow-y"],
        "border-w" => &[
            "border-w-x",
            "border-w-y",
            "border-w-t",
            "border-w-r",
            "border-w-b",
            "border-w-l",
        ],
        "border-w-x" => &["border-w-r", "border-w-l"],
        "border-w-y" => &["border-w-t", "border-w-b"],
        "rounded" => &[
            "rounded-t",
            "rounded-r",
            "rounded-b",
            "rounded-l",
            "rounded-tl",
            "rounded-tr",
            "rounded-br",
            "rounded-bl",
        ],
        "rounded-t" => &["rounded-tl", "rounded-tr"],
        "rounded-r" => &["rounded-tr", "rounded-br"],
        "rounded-b" => &["rounded-br", "rounded-bl"],
        "rounded-l" => &["rounded-tl", "rounded-bl"],
        _ => &[],
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Everything that must match for two classes to conflict.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ConflictKey {
    modifiers: String,
    important: bool,
    family: String,
}

impl ConflictKey {
    fn with_family(&self, family: &str) -> Self {
        ConflictKey {
            modifiers: self.modifiers.clone(),
            important: self.important,
            family: family.to_string(),
        }
    }
}

/// Splits on `:` outside of square brackets.
fn split_variants(token: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in token.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => {
                parts.push(&token[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&token[start..]);
    parts
}

/// Sorts runs of plain variants; arbitrary `[...]` variants stay in place
/// since their order is significant.
fn normalize_modifiers(modifiers: &[&str]) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(modifiers.len());
    let mut run: Vec<&str> = Vec::new();
    for &m in modifiers {
        if m.starts_with('[') {
            run.sort_unstable();
            out.append(&mut run);
            out.push(m);
        } else {
            run.push(m);
        }
    }
    run.sort_unstable();
    out.append(&mut run);
    out.join(":")
}

fn family_of(base: &str) -> Option<String> {
    if let Some(caps) = ARBITRARY_PROPERTY_RE.captures(base) {
        return Some(format!("arbitrary:{}", &caps[1]));
    }
    FAMILY_TABLE
        .iter()
        .find(|(re, _)| re.is_match(base))
        .map(|(_, family)| family.to_string())
}

fn conflict_key(token: &str) -> Option<ConflictKey> {
    let mut parts = split_variants(token);
    let utility = parts.pop()?;

    let (important, utility) = if let Some(rest) = utility.strip_prefix('!') {
        (true, rest)
    } else if let Some(rest) = utility.strip_suffix('!') {
        (true, rest)
    } else {
        (false, utility)
    };
    let utility = utility.strip_prefix('-').unwrap_or(utility);

    Some(ConflictKey {
        modifiers: normalize_modifiers(&parts),
        important,
        family: family_of(utility)?,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// MERGE
// ═══════════════════════════════════════════════════════════════════════════════

/// Merges `overlay` over `base`.
///
/// Within the overlay the last class of a family wins. Surviving base classes
/// come first, followed by the overlay's classes in their original order.
///
/// ```
/// use tdc_compiler::merge_classes;
///
/// assert_eq!(merge_classes("w-12 h-4", "w-24"), "h-4 w-24");
/// assert_eq!(merge_classes("px-2 py-1 hover:p-3", "p-4"), "hover:p-3 p-4");
/// ```
pub fn merge_classes(base: &str, overlay: &str) -> String {
    let mut claimed: HashSet<ConflictKey> = HashSet::new();
    let mut exact: HashSet<&str> = HashSet::new();
    let mut kept_overlay: Vec<&str> = Vec::new();

    for token in overlay.split_whitespace().rev() {
        if !exact.insert(token) {
            continue;
        }
        if let Some(key) = conflict_key(token) {
            if claimed.contains(&key) {
                continue;
            }
            for family in subsumed(&key.family) {
                claimed.insert(key.with_family(family));
            }
            claimed.insert(key);
        }
        kept_overlay.push(token);
    }
    kept_overlay.reverse();

    let mut merged: Vec<&str> = base
        .split_whitespace()
        .filter(|token| !exact.contains(token))
        .filter(|token| match conflict_key(token) {
            Some(key) => !claimed.contains(&key),
            None => true,
        })
        .collect();
    merged.extend(kept_overlay);
    merged.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_family_overridden() {
        assert_eq!(merge_classes("w-12", "w-24"), "w-24");
        assert_eq!(merge_classes("bg-red-400 h-4", "bg-green-400"), "h-4 bg-green-400");
    }

    #[test]
    fn test_unrelated_families_survive() {
        assert_eq!(merge_classes("h-4 text-sm", "w-24"), "h-4 text-sm w-24");
    }

    #[test]
    fn test_text_size_and_color_do_not_conflict() {
        assert_eq!(merge_classes("text-sm text-red-500", "text-lg"), "text-red-500 text-lg");
        assert_eq!(merge_classes("text-sm text-red-500", "text-blue-500"), "text-sm text-blue-500");
        assert_eq!(merge_classes("text-left", "text-center"), "text-center");
    }

    #[test]
    fn test_modifier_chains_must_match() {
        assert_eq!(merge_classes("hover:w-12 w-12", "w-24"), "hover:w-12 w-24");
        assert_eq!(merge_classes("md:hover:w-12", "hover:md:w-24"), "hover:md:w-24");
    }

    #[test]
    fn test_important_flag_separates() {
        assert_eq!(merge_classes("!w-12", "w-24"), "!w-12 w-24");
        assert_eq!(merge_classes("!w-12", "w-24!"), "w-24!");
    }

    #[test]
    fn test_shorthand_subsumes_sides() {
        assert_eq!(merge_classes("px-2 pt-1 m-2", "p-4"), "m-2 p-4");
        assert_eq!(merge_classes("p-4", "px-2"), "p-4 px-2");
        assert_eq!(merge_classes("rounded-tl-lg rounded-b", "rounded-none"), "rounded-none");
    }

    #[test]
    fn test_last_overlay_class_wins() {
        assert_eq!(merge_classes("", "w-4 w-8"), "w-8");
        assert_eq!(merge_classes("", "px-2 p-4"), "p-4");
        assert_eq!(merge_classes("", "p-4 px-2"), "p-4 px-2");
    }

    #[test]
    fn test_negative_values_share_family() {
        assert_eq!(merge_classes("-mt-2", "mt-4"), "mt-4");
    }

    #[test]
    fn test_border_width_vs_color() {
        assert_eq!(merge_classes("border-2 border-red-500", "border-4"), "border-red-500 border-4");
        assert_eq!(merge_classes("border-2 border-t-4", "border"), "border");
    }

    #[test]
    fn test_unknown_utilities_only_conflict_when_identical() {
        assert_eq!(merge_classes("my-widget foo", "foo bar"), "my-widget foo bar");
    }

    #[test]
    fn test_arbitrary_properties() {
        assert_eq!(merge_classes("[mask-type:luminance] w-2", "[mask-type:alpha]"), "w-2 [mask-type:alpha]");
        assert_eq!(merge_classes("w-[13px]", "w-24"), "w-24");
    }
}
