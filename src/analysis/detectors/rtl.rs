//! RTL Detector
//!
//! Finds layout attributes and gravity values hardcoded to `left`/`right`
//! in projects that declare right-to-left support. Whether `android:supportsRtl`
//! is set and which `minSdkVersion` applies are only known after the
//! manifest has been seen, so every finding is provisional and worded in
//! [`Detector::filter`].
//!
//! ## Anti-Pattern
//!
//! ```xml
//! <TextView
//!     android:paddingLeft="8dp"
//!     android:gravity="left" />
//! ```
//!
//! ## Why It's Bad
//!
//! - Arabic and Hebrew users get a mirrored UI with unmirrored spacing
//! - `left` gravity stays on the left in RTL locales
//!
//! ## Better Alternatives
//!
//! ```xml
//! <TextView
//!     android:paddingStart="8dp"
//!     android:gravity="start" />
//! ```

use crate::analysis::{
    facts, DataValue, Detector, DetectorContext, Finding, FindingData, Fix, Interest, ProjectFacts,
    Trigger,
};
use crate::issues::{Category, Implementation, Issue, ScopeSet, Severity};
use crate::model::NodeId;

pub static USE_START: Issue = Issue::create(
    "RtlHardcoded",
    "Using left/right instead of start/end attributes",
    "Using `Gravity#LEFT` and `Gravity#RIGHT` can lead to problems when a layout is \
     rendered in locales where text flows from right to left. Use `Gravity#START` \
     and `Gravity#END` instead. Similarly, in XML `gravity` and `layout_gravity` \
     attributes, use `start` rather than `left`. For XML attributes such as \
     `paddingLeft` and `layout_marginLeft`, use `paddingStart` and \
     `layout_marginStart`. If your app's `minSdkVersion` is less than 17, you \
     should add both the older left/right attributes as well as the new \
     start/end attributes.",
    Category::Bidirectional,
    5,
    Severity::Warning,
    Implementation::new("RtlDetector", ScopeSet::RESOURCES_AND_MANIFEST),
);

/// First API level with start/end attributes
const RTL_API: u32 = 17;

/// Left/right attributes and their start/end replacements
const ATTRIBUTES: &[(&str, &str)] = &[
    ("paddingLeft", "paddingStart"),
    ("paddingRight", "paddingEnd"),
    ("layout_marginLeft", "layout_marginStart"),
    ("layout_marginRight", "layout_marginEnd"),
    ("layout_alignParentLeft", "layout_alignParentStart"),
    ("layout_alignParentRight", "layout_alignParentEnd"),
    ("layout_alignLeft", "layout_alignStart"),
    ("layout_alignRight", "layout_alignEnd"),
    ("layout_toLeftOf", "layout_toStartOf"),
    ("layout_toRightOf", "layout_toEndOf"),
    ("drawableLeft", "drawableStart"),
    ("drawableRight", "drawableEnd"),
    ("listPreferredItemPaddingLeft", "listPreferredItemPaddingStart"),
    ("listPreferredItemPaddingRight", "listPreferredItemPaddingEnd"),
    ("checkMarkGravity", "checkMarkGravity"),
];

const GRAVITY_ATTRIBUTES: &[&str] = &["gravity", "layout_gravity"];

// Finding data keys
const MODE: &str = "mode";
const NAME: &str = "name";
const RTL_NAME: &str = "rtl";
const PREFIX: &str = "prefix";
const VALUE: &str = "value";

const MODE_GRAVITY: &str = "gravity";
const MODE_REDUNDANT: &str = "redundant";
const MODE_MISSING: &str = "missing";

/// Detector for left/right attributes and gravities
pub struct RtlDetector;

impl RtlDetector {
    pub fn new() -> Self {
        Self
    }

    fn rtl_name(name: &str) -> Option<&'static str> {
        ATTRIBUTES
            .iter()
            .find(|(left, rtl)| *left == name && left != rtl)
            .map(|&(_, rtl)| rtl)
    }

    fn check_gravity(ctx: &mut DetectorContext<'_>, attribute: NodeId) {
        let data = ctx.tree().node(attribute);
        let Some(value) = data.value.clone() else {
            return;
        };
        let Some((hardcoded, replacement)) = value.split('|').map(str::trim).find_map(|token| match token {
            "left" => Some(("left", "start")),
            "right" => Some(("right", "end")),
            _ => None,
        }) else {
            return;
        };

        let fixed = value
            .split('|')
            .map(|token| match token.trim() {
                "left" => "start",
                "right" => "end",
                other => other,
            })
            .collect::<Vec<_>>()
            .join("|");
        let message = format!(
            "Use \"`{}`\" instead of \"`{}`\" to ensure correct behavior in right-to-left locales",
            replacement, hardcoded
        );
        let finding = ctx
            .finding(&USE_START, attribute, message)
            .with_fix(Fix::replace(format!("Replace with {}", replacement), fixed))
            .with_data(FindingData::new().with_str(MODE, MODE_GRAVITY));
        ctx.report_finding(finding);
    }

    fn check_attribute(ctx: &mut DetectorContext<'_>, attribute: NodeId, name: &str, rtl: &'static str) {
        let tree = ctx.tree();
        let data = tree.node(attribute);
        let prefix = data.prefix.clone().unwrap_or_else(|| "android".to_string());
        let value = data.value.clone().unwrap_or_default();
        let defines_rtl = tree
            .parent(attribute)
            .map(|element| {
                tree.children(element)
                    .iter()
                    .any(|&sibling| tree.name(sibling) == Some(rtl))
            })
            .unwrap_or(false);

        let mode = if defines_rtl { MODE_REDUNDANT } else { MODE_MISSING };
        let message = format!("Consider adding `{}:{}=\"{}\"`", prefix, rtl, value);
        let finding = ctx.finding(&USE_START, attribute, message).with_data(
            FindingData::new()
                .with_str(MODE, mode)
                .with_str(NAME, name)
                .with_str(RTL_NAME, rtl)
                .with_str(PREFIX, prefix)
                .with_str(VALUE, value),
        );
        ctx.report_finding(finding);
    }

    /// `<application android:supportsRtl="true">`
    fn record_support(ctx: &mut DetectorContext<'_>, element: NodeId) {
        let tree = ctx.tree();
        let supports = tree
            .children(element)
            .iter()
            .find(|&&attribute| tree.name(attribute) == Some("supportsRtl"))
            .and_then(|&attribute| tree.node(attribute).value.as_deref())
            .map(|value| value.trim() == "true");
        if let Some(supports) = supports {
            ctx.record_fact(facts::SUPPORTS_RTL, DataValue::Bool(supports));
        }
    }
}

impl Default for RtlDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for RtlDetector {
    fn name(&self) -> &'static str {
        "RtlDetector"
    }

    fn issues(&self) -> Vec<&'static Issue> {
        vec![&USE_START]
    }

    fn interests(&self) -> Vec<Interest> {
        ATTRIBUTES
            .iter()
            .filter(|(left, rtl)| left != rtl)
            .map(|&(left, _)| left)
            .chain(GRAVITY_ATTRIBUTES.iter().copied())
            .map(|name| Interest::xml(Trigger::XmlAttribute(name)))
            .chain(std::iter::once(Interest::xml(Trigger::XmlElement("application"))))
            .collect()
    }

    fn on_xml_attribute(&self, ctx: &mut DetectorContext<'_>, attribute: NodeId) -> anyhow::Result<()> {
        let Some(name) = ctx.tree().name(attribute) else {
            return Ok(());
        };
        if GRAVITY_ATTRIBUTES.contains(&name) {
            Self::check_gravity(ctx, attribute);
        } else if let Some(rtl) = Self::rtl_name(name) {
            Self::check_attribute(ctx, attribute, name, rtl);
        }
        Ok(())
    }

    fn on_xml_element(&self, ctx: &mut DetectorContext<'_>, element: NodeId) -> anyhow::Result<()> {
        Self::record_support(ctx, element);
        Ok(())
    }

    fn filter(&self, finding: &mut Finding, known: &ProjectFacts) -> bool {
        if !known.supports_rtl() {
            return false;
        }
        let Some(data) = finding.data.as_ref() else {
            return true;
        };
        let field = |key: &str| data.str(key).unwrap_or_default().to_string();
        let min_sdk = known.min_sdk().unwrap_or(1);
        let rtl_only = min_sdk >= RTL_API;

        let message = match data.str(MODE) {
            Some(MODE_GRAVITY) => return true,
            Some(MODE_REDUNDANT) => {
                // Older platforms still need both
                if !rtl_only {
                    return false;
                }
                let target = known
                    .int(facts::TARGET_SDK)
                    .unwrap_or_else(|| i64::from(min_sdk));
                format!(
                    "Redundant attribute `{}`; already defining `{}` with `targetSdkVersion` {}",
                    field(NAME),
                    field(RTL_NAME),
                    target
                )
            }
            _ if rtl_only => format!(
                "Consider replacing `{}:{}` with `{}:{}=\"{}\"` to better support right-to-left layouts",
                field(PREFIX),
                field(NAME),
                field(PREFIX),
                field(RTL_NAME),
                field(VALUE)
            ),
            _ => format!(
                "Consider adding `{}:{}=\"{}\"` to better support right-to-left layouts",
                field(PREFIX),
                field(RTL_NAME),
                field(VALUE)
            ),
        };
        finding.message = message;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::detectors::testing::{config, layout, manifest, messages, run_with};
    use crate::config::Config;
    use crate::model::Tree;

    const RTL_MANIFEST: &str = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="test.pkg">
    <application android:supportsRtl="true" android:label="Test" />
</manifest>
"#;

    fn analyze(min_sdk: u32, trees: Vec<Tree>) -> Vec<String> {
        let config = Config {
            min_sdk: Some(min_sdk),
            ..config()
        };
        let report = run_with(config, Box::new(RtlDetector::new()), trees, None);
        messages(&report, "RtlHardcoded")
    }

    fn padding_layout() -> Tree {
        layout(
            "res/layout/main.xml",
            r#"<LinearLayout xmlns:android="http://schemas.android.com/apk/res/android"
    android:layout_width="match_parent"
    android:layout_height="match_parent">
    <TextView android:paddingLeft="8dp" />
    <TextView android:paddingRight="4dp" android:paddingEnd="4dp" />
</LinearLayout>
"#,
        )
    }

    #[test]
    fn test_replace_when_min_sdk_supports_rtl() {
        let messages = analyze(17, vec![padding_layout(), manifest(RTL_MANIFEST)]);
        assert_eq!(
            messages,
            vec![
                "Consider replacing `android:paddingLeft` with `android:paddingStart=\"8dp\"` to better support right-to-left layouts",
                "Redundant attribute `paddingRight`; already defining `paddingEnd` with `targetSdkVersion` 17",
            ]
        );
    }

    #[test]
    fn test_add_for_older_platforms() {
        let messages = analyze(14, vec![padding_layout(), manifest(RTL_MANIFEST)]);
        assert_eq!(
            messages,
            vec!["Consider adding `android:paddingStart=\"8dp\"` to better support right-to-left layouts"]
        );
    }

    #[test]
    fn test_gravity_values() {
        let tree = layout(
            "res/layout/gravity.xml",
            r#"<FrameLayout xmlns:android="http://schemas.android.com/apk/res/android">
    <TextView android:gravity="left|center_vertical" />
    <TextView android:layout_gravity="end" />
</FrameLayout>
"#,
        );
        let report = run_with(
            Config {
                min_sdk: Some(21),
                ..config()
            },
            Box::new(RtlDetector::new()),
            vec![tree, manifest(RTL_MANIFEST)],
            None,
        );
        let findings: Vec<_> = report
            .findings
            .iter()
            .filter(|f| f.issue.id == "RtlHardcoded")
            .collect();
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].message,
            "Use \"`start`\" instead of \"`left`\" to ensure correct behavior in right-to-left locales"
        );
        assert_eq!(
            findings[0].fix.as_ref().and_then(|f| f.replacement.as_deref()),
            Some("start|center_vertical")
        );
    }

    #[test]
    fn test_nothing_without_rtl_support() {
        let plain = manifest(
            r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="test.pkg">
    <application android:label="Test" />
</manifest>
"#,
        );
        assert!(analyze(17, vec![padding_layout(), plain]).is_empty());
        assert!(analyze(17, vec![padding_layout()]).is_empty());
    }
}
