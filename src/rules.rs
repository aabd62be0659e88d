//! The rule matcher: class/title driven placement overrides applied on adoption
//! (spec.md §4.4, §3 "Rule").
use crate::x::WindowClass;

/// Placement overrides a matched [Rule] yields, applied by the window-state
/// engine rather than by the rule itself (spec.md §4.4: "Returns overrides
/// structurally; the state engine applies them").
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Target workspace index, if the rule names one
    pub workspace: Option<usize>,
    /// Target monitor id, if the rule names one
    pub monitor: Option<usize>,
    /// Force the window floating
    pub float: bool,
    /// A relative placement "area" token, opaque to the matcher (spec.md §6 `rule area=`)
    pub area: Option<String>,
}

/// A single ordered rule: equality match on class and, optionally, title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    class: Option<String>,
    title: Option<String>,
    placement: Placement,
}

impl Rule {
    /// Construct a rule from its match predicates and the overrides it yields.
    pub fn new(class: Option<String>, title: Option<String>, placement: Placement) -> Self {
        Self {
            class,
            title,
            placement,
        }
    }

    /// Whether `window` satisfies this rule's predicates. A rule with no
    /// predicates at all never matches: it would otherwise shadow every window
    /// unconditionally (spec.md §8 boundary: "missing fields ... non-matching
    /// for class-bearing rules").
    fn matches(&self, window: &WindowClass) -> bool {
        if self.class.is_none() && self.title.is_none() {
            return false;
        }

        let class_ok = match &self.class {
            Some(want) => window.class.as_deref() == Some(want.as_str()),
            None => true,
        };
        let title_ok = match &self.title {
            Some(want) => window.title.as_deref() == Some(want.as_str()),
            None => true,
        };

        class_ok && title_ok
    }
}

/// An ordered list of rules, first match wins (spec.md §3 "Rule": "Rules are
/// order-preserving; first match wins").
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// An empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. The `rule` command (spec.md §6) only ever appends; there
    /// is no verb to remove or reorder a single rule short of `reload-config`.
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Drop every rule, used by `reload-config`'s reset step (spec.md §4.8).
    pub fn clear(&mut self) {
        self.rules.clear();
    }

    /// Find the first rule (in insertion order) whose predicates match `window`.
    pub fn matching(&self, window: &WindowClass) -> Option<&Placement> {
        self.rules
            .iter()
            .find(|r| r.matches(window))
            .map(|r| &r.placement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    fn window(class: Option<&str>, title: Option<&str>) -> WindowClass {
        WindowClass {
            class: class.map(String::from),
            title: title.map(String::from),
        }
    }

    #[test]
    fn first_match_wins() {
        let mut rules = RuleSet::new();
        rules.push(Rule::new(
            Some("Xterm".into()),
            None,
            Placement {
                workspace: Some(1),
                ..Default::default()
            },
        ));
        rules.push(Rule::new(
            Some("Xterm".into()),
            None,
            Placement {
                workspace: Some(2),
                ..Default::default()
            },
        ));

        let got = rules.matching(&window(Some("Xterm"), None)).unwrap();
        assert_eq!(got.workspace, Some(1));
    }

    #[test_case(Some("Firefox"), None, true; "class only matches")]
    #[test_case(Some("firefox"), None, false; "case sensitive")]
    #[test_case(None, None, false; "no class no match")]
    #[test]
    fn class_only_rule(class: Option<&str>, title: Option<&str>, expect_match: bool) {
        let mut rules = RuleSet::new();
        rules.push(Rule::new(
            Some("Firefox".into()),
            None,
            Placement::default(),
        ));

        assert_eq!(
            rules.matching(&window(class, title)).is_some(),
            expect_match
        );
    }

    #[test]
    fn class_and_title_both_required() {
        let mut rules = RuleSet::new();
        rules.push(Rule::new(
            Some("Xterm".into()),
            Some("scratch".into()),
            Placement::default(),
        ));

        assert!(rules.matching(&window(Some("Xterm"), Some("scratch"))).is_some());
        assert!(rules.matching(&window(Some("Xterm"), Some("other"))).is_none());
        assert!(rules.matching(&window(Some("Xterm"), None)).is_none());
    }

    #[test]
    fn empty_predicates_never_match() {
        let mut rules = RuleSet::new();
        rules.push(Rule::new(None, None, Placement::default()));
        assert!(rules.matching(&window(Some("Xterm"), Some("t"))).is_none());
    }

    #[test]
    fn clear_empties_rules() {
        let mut rules = RuleSet::new();
        rules.push(Rule::new(Some("Xterm".into()), None, Placement::default()));
        rules.clear();
        assert!(rules.matching(&window(Some("Xterm"), None)).is_none());
    }
}
