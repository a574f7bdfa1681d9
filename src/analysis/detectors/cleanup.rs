//! Cleanup Detector
//!
//! Detects pooled or native-backed objects that are obtained and never
//! handed back: `TypedArray`, `MotionEvent`, `Parcel` and `VelocityTracker`
//! need `recycle()`, database cursors need `close()`.
//!
//! ## Anti-Pattern
//!
//! ```java
//! TypedArray a = context.obtainStyledAttributes(attrs, R.styleable.MyView);
//! String label = a.getString(R.styleable.MyView_label);
//! // a.recycle() is missing!
//! ```
//!
//! ## Why It's Bad
//!
//! - The object never returns to its pool
//! - Cursors keep a database window open until finalization
//! - Leaks show up as `StrictMode` violations and memory pressure
//!
//! ## Better Alternatives
//!
//! ```java
//! TypedArray a = context.obtainStyledAttributes(attrs, R.styleable.MyView);
//! try {
//!     label = a.getString(R.styleable.MyView_label);
//! } finally {
//!     a.recycle();
//! }
//!
//! try (Cursor c = db.rawQuery(sql, null)) { ... }
//! ```

use crate::analysis::{Detector, DetectorContext, EscapeOutcome, EscapeTracker, Interest, Trigger};
use crate::evaluator::{Evaluator, MethodRef};
use crate::issues::{Category, Implementation, Issue, ScopeSet, Severity};
use crate::model::NodeId;

pub static RECYCLE_RESOURCE: Issue = Issue::create(
    "Recycle",
    "Missing `recycle()` calls",
    "Many resources, such as TypedArrays, VelocityTrackers, etc., should be recycled \
     (with a `recycle()` call) after use. This check looks for missing `recycle()` \
     calls, and database cursors that are not closed.",
    Category::Performance,
    7,
    Severity::Warning,
    Implementation::new("CleanupDetector", ScopeSet::JAVA_FILE),
);

const MOTION_EVENT: &str = "android.view.MotionEvent";
const PARCEL: &str = "android.os.Parcel";
const VELOCITY_TRACKER: &str = "android.view.VelocityTracker";
const TYPED_ARRAY: &str = "android.content.res.TypedArray";

const CURSOR_OWNERS: &[&str] = &[
    "android.database.sqlite.SQLiteDatabase",
    "android.content.ContentResolver",
    "android.content.ContentProvider",
    "android.content.ContentProviderClient",
];

const OBTAIN_METHODS: &[&str] = &["obtain", "obtainNoHistory"];
const TYPED_ARRAY_METHODS: &[&str] = &["obtainStyledAttributes", "obtainAttributes", "obtainTypedArray"];
const QUERY_METHODS: &[&str] = &["query", "rawQuery", "queryWithFactory", "rawQueryWithFactory"];

/// What an allocation produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    /// Returned with `recycle()`; simple class name
    Recycled(&'static str),
    Cursor,
}

impl Resource {
    fn message(self) -> String {
        match self {
            Resource::Recycled(class) => {
                format!("This `{}` should be recycled after use with `#recycle()`", class)
            }
            Resource::Cursor => "This `Cursor` should be freed up after use with `#close()`".to_string(),
        }
    }
}

/// Detector for obtained objects that are never released
pub struct CleanupDetector;

impl CleanupDetector {
    pub fn new() -> Self {
        Self
    }

    fn resource(evaluator: &Evaluator<'_>, call: NodeId, method: &MethodRef<'_>) -> Option<Resource> {
        let name = method.name.as_str();
        if OBTAIN_METHODS.contains(&name) {
            if method.is_member_of(evaluator, MOTION_EVENT) {
                return Some(Resource::Recycled("MotionEvent"));
            }
            if name == "obtain" && method.is_member_of(evaluator, PARCEL) {
                return Some(Resource::Recycled("Parcel"));
            }
            if name == "obtain" && method.is_member_of(evaluator, VELOCITY_TRACKER) {
                return Some(Resource::Recycled("VelocityTracker"));
            }
            return None;
        }
        if TYPED_ARRAY_METHODS.contains(&name) {
            // Matched by name unless the call is known to return something else
            let returns_other = evaluator
                .type_of(call)
                .is_some_and(|t| t != TYPED_ARRAY && !t.ends_with("TypedArray"));
            return (!returns_other).then_some(Resource::Recycled("TypedArray"));
        }
        if QUERY_METHODS.contains(&name)
            && CURSOR_OWNERS
                .iter()
                .any(|owner| method.is_member_of(evaluator, owner))
        {
            return Some(Resource::Cursor);
        }
        None
    }
}

impl Default for CleanupDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn is_cleanup(method: &MethodRef<'_>) -> bool {
    matches!(method.name.as_str(), "recycle" | "close")
}

impl Detector for CleanupDetector {
    fn name(&self) -> &'static str {
        "CleanupDetector"
    }

    fn issues(&self) -> Vec<&'static Issue> {
        vec![&RECYCLE_RESOURCE]
    }

    fn interests(&self) -> Vec<Interest> {
        OBTAIN_METHODS
            .iter()
            .chain(TYPED_ARRAY_METHODS)
            .chain(QUERY_METHODS)
            .map(|name| Interest::source(Trigger::MethodCall(*name)))
            .collect()
    }

    fn on_method_call(
        &self,
        ctx: &mut DetectorContext<'_>,
        call: NodeId,
        method: &MethodRef<'_>,
    ) -> anyhow::Result<()> {
        let evaluator = *ctx.evaluator();
        let Some(resource) = Self::resource(&evaluator, call, method) else {
            return Ok(());
        };

        // MotionEvent.obtain(event) copies its argument
        let copies = |m: &MethodRef<'_>| m.name == "obtain" && m.is_member_of(&evaluator, MOTION_EVENT);
        let outcome = EscapeTracker::new(evaluator, &is_cleanup)
            .with_non_escaping(&copies)
            .analyze_allocation(call);

        if outcome == EscapeOutcome::Leaked {
            ctx.report(&RECYCLE_RESOURCE, call, resource.message());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::detectors::testing::{java, messages, run};

    const RECYCLER: &str = r#"package test.pkg;
import android.content.Context;
import android.content.res.TypedArray;
import android.database.Cursor;
import android.database.sqlite.SQLiteDatabase;
import android.util.AttributeSet;
import android.view.MotionEvent;

public class Recycler {
    void leak(Context context, AttributeSet attrs) {
        TypedArray a = context.obtainStyledAttributes(attrs, new int[0]);
        String s = a.getString(0);
    }

    void recycled(Context context, AttributeSet attrs) {
        TypedArray a = context.obtainStyledAttributes(attrs, new int[0]);
        a.recycle();
    }

    void cursor(SQLiteDatabase db) {
        Cursor c = db.query("t", null, null, null, null, null, null);
        c.moveToFirst();
    }

    void closedCursor(SQLiteDatabase db) {
        try (Cursor c = db.rawQuery("select 1", null)) {
            c.moveToFirst();
        }
    }

    MotionEvent returned() {
        return MotionEvent.obtain(0L, 0L, 0, 0f, 0f, 0);
    }

    void copied() {
        MotionEvent event = MotionEvent.obtain(0L, 0L, 0, 0f, 0f, 0);
        MotionEvent copy = MotionEvent.obtain(event);
        copy.recycle();
    }
}
"#;

    #[test]
    fn test_missing_recycle_and_close() {
        let tree = java("src/test/pkg/Recycler.java", RECYCLER);
        let report = run(Box::new(CleanupDetector::new()), vec![tree]);
        assert_eq!(
            messages(&report, "Recycle"),
            vec![
                "This `TypedArray` should be recycled after use with `#recycle()`",
                "This `Cursor` should be freed up after use with `#close()`",
                "This `MotionEvent` should be recycled after use with `#recycle()`",
            ]
        );
    }

    #[test]
    fn test_unrelated_obtain_is_ignored() {
        let tree = java(
            "src/test/pkg/Pool.java",
            r#"package test.pkg;

public class Pool {
    static Pool obtain() { return new Pool(); }

    void use() {
        Pool p = Pool.obtain();
    }
}
"#,
        );
        let report = run(Box::new(CleanupDetector::new()), vec![tree]);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn test_chained_recycle() {
        let tree = java(
            "src/test/pkg/Chained.java",
            r#"package test.pkg;
import android.os.Parcel;

public class Chained {
    void use() {
        Parcel.obtain().recycle();
        Parcel.obtain();
    }
}
"#,
        );
        let report = run(Box::new(CleanupDetector::new()), vec![tree]);
        assert_eq!(
            messages(&report, "Recycle"),
            vec!["This `Parcel` should be recycled after use with `#recycle()`"]
        );
    }
}
