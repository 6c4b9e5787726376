use serde::Serialize;

use tikvah_types::{Gender, Participant};

/// A single yes/no pairing rule, read from `me`'s point of view.
///
/// Rules only judge what `me` asked for; `CompatibilityFilter` asks both
/// sides. Missing answers never disqualify anyone.
pub trait CompatibilityRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn accepts(&self, me: &Participant, them: &Participant) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Match,
    Rejected { rule: &'static str },
}

impl Verdict {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }
}

/// Ordered chain of rules; every rule must hold in both directions.
pub struct CompatibilityFilter {
    rules: Vec<Box<dyn CompatibilityRule>>,
}

impl CompatibilityFilter {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: impl CompatibilityRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn without(mut self, name: &str) -> Self {
        self.rules.retain(|rule| rule.name() != name);
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    pub fn check(&self, a: &Participant, b: &Participant) -> Verdict {
        for rule in &self.rules {
            if !rule.accepts(a, b) || !rule.accepts(b, a) {
                return Verdict::Rejected { rule: rule.name() };
            }
        }
        Verdict::Match
    }
}

impl Default for CompatibilityFilter {
    fn default() -> Self {
        Self::empty()
            .with_rule(LookingFor)
            .with_rule(AgeRangeRule)
            .with_rule(KohenRule)
            .with_rule(MaritalStatusRule)
            .with_rule(EthnicityRule)
            .with_rule(SubgroupRule)
            .with_rule(DressRule)
    }
}

/// True when `list` is empty, `value` is unknown, or `value` is listed.
fn open_to<T: PartialEq>(list: &[T], value: Option<&T>) -> bool {
    match value {
        Some(v) if !list.is_empty() => list.contains(v),
        _ => true,
    }
}

pub struct LookingFor;

impl CompatibilityRule for LookingFor {
    fn name(&self) -> &'static str {
        "looking-for"
    }

    fn accepts(&self, me: &Participant, them: &Participant) -> bool {
        me.profile.looking_for.is_none_or(|g| g == them.gender)
    }
}

pub struct AgeRangeRule;

impl CompatibilityRule for AgeRangeRule {
    fn name(&self) -> &'static str {
        "age-range"
    }

    fn accepts(&self, me: &Participant, them: &Participant) -> bool {
        match (me.profile.age_range, them.profile.age) {
            (Some(range), Some(age)) => range.contains(age),
            _ => true,
        }
    }
}

/// A kohen may not marry a divorced woman.
pub struct KohenRule;

impl CompatibilityRule for KohenRule {
    fn name(&self) -> &'static str {
        "kohen"
    }

    fn accepts(&self, me: &Participant, them: &Participant) -> bool {
        if !me.profile.is_kohen || them.gender != Gender::Woman {
            return true;
        }
        !them.profile.marital_status.is_some_and(|s| s.is_divorced())
    }
}

pub struct MaritalStatusRule;

impl CompatibilityRule for MaritalStatusRule {
    fn name(&self) -> &'static str {
        "marital-status"
    }

    fn accepts(&self, me: &Participant, them: &Participant) -> bool {
        open_to(
            &me.profile.open_to_marital_statuses,
            them.profile.marital_status.as_ref(),
        )
    }
}

pub struct EthnicityRule;

impl CompatibilityRule for EthnicityRule {
    fn name(&self) -> &'static str {
        "ethnicity"
    }

    fn accepts(&self, me: &Participant, them: &Participant) -> bool {
        open_to(&me.profile.open_to_ethnicities, them.profile.ethnicity.as_ref())
    }
}

pub struct SubgroupRule;

impl CompatibilityRule for SubgroupRule {
    fn name(&self) -> &'static str {
        "subgroup"
    }

    fn accepts(&self, me: &Participant, them: &Participant) -> bool {
        open_to(&me.profile.open_to_subgroups, them.profile.subgroup.as_ref())
    }
}

pub struct DressRule;

impl CompatibilityRule for DressRule {
    fn name(&self) -> &'static str {
        "dress"
    }

    fn accepts(&self, me: &Participant, them: &Participant) -> bool {
        open_to(&me.profile.open_to_dress, them.profile.dress.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tikvah_types::{AgeRange, MaritalStatus, Profile};
    use uuid::Uuid;

    fn attendee(gender: Gender, profile: Profile) -> Participant {
        Participant {
            id: Uuid::new_v4(),
            event_id: Uuid::nil(),
            name: "Test".into(),
            email: None,
            phone: None,
            gender,
            checked_in: true,
            seat: None,
            profile,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_blank_profiles_match() {
        let man = attendee(Gender::Man, Profile::default());
        let woman = attendee(Gender::Woman, Profile::default());
        assert_eq!(CompatibilityFilter::default().check(&man, &woman), Verdict::Match);
    }

    #[test]
    fn test_default_chain_order() {
        assert_eq!(
            CompatibilityFilter::default().rule_names(),
            vec!["looking-for", "age-range", "kohen", "marital-status", "ethnicity", "subgroup", "dress"]
        );
    }

    #[test]
    fn test_looking_for() {
        let man = attendee(
            Gender::Man,
            Profile { looking_for: Some(Gender::Man), ..Profile::default() },
        );
        let woman = attendee(Gender::Woman, Profile::default());
        assert!(!LookingFor.accepts(&man, &woman));
        assert!(LookingFor.accepts(&woman, &man));
    }

    #[test]
    fn test_age_range_is_mutual() {
        let man = attendee(
            Gender::Man,
            Profile { age: Some(41), age_range: Some(AgeRange { min: 25, max: 35 }), ..Profile::default() },
        );
        let woman = attendee(
            Gender::Woman,
            Profile { age: Some(30), age_range: Some(AgeRange { min: 28, max: 40 }), ..Profile::default() },
        );
        // He accepts her, she does not accept him.
        assert!(AgeRangeRule.accepts(&man, &woman));
        assert!(!AgeRangeRule.accepts(&woman, &man));
        assert_eq!(
            CompatibilityFilter::default().check(&man, &woman),
            Verdict::Rejected { rule: "age-range" }
        );
    }

    #[test]
    fn test_kohen_and_divorcee() {
        let kohen = attendee(Gender::Man, Profile { is_kohen: true, ..Profile::default() });
        let divorced = attendee(
            Gender::Woman,
            Profile { marital_status: Some(MaritalStatus::DivorcedWithKids), ..Profile::default() },
        );
        let widowed = attendee(
            Gender::Woman,
            Profile { marital_status: Some(MaritalStatus::Widowed), ..Profile::default() },
        );
        let filter = CompatibilityFilter::default();
        assert_eq!(filter.check(&divorced, &kohen), Verdict::Rejected { rule: "kohen" });
        assert_eq!(filter.check(&kohen, &widowed), Verdict::Match);
    }

    #[test]
    fn test_preference_lists() {
        let man = attendee(
            Gender::Man,
            Profile {
                ethnicity: Some("Ashkenazi".into()),
                open_to_subgroups: vec!["Chabad".into(), "Heimish".into()],
                ..Profile::default()
            },
        );
        let woman = attendee(
            Gender::Woman,
            Profile {
                subgroup: Some("Yeshivish".into()),
                open_to_ethnicities: vec!["Ashkenazi".into()],
                ..Profile::default()
            },
        );
        assert!(EthnicityRule.accepts(&woman, &man));
        assert!(!SubgroupRule.accepts(&man, &woman));
        assert_eq!(
            CompatibilityFilter::default().check(&man, &woman),
            Verdict::Rejected { rule: "subgroup" }
        );
    }

    #[test]
    fn test_dress_and_marital_lists() {
        let man = attendee(
            Gender::Man,
            Profile {
                open_to_dress: vec!["covered hair".into()],
                open_to_marital_statuses: vec![MaritalStatus::Single],
                ..Profile::default()
            },
        );
        let woman = attendee(
            Gender::Woman,
            Profile {
                dress: Some("covered hair".into()),
                marital_status: Some(MaritalStatus::SingleWithKids),
                ..Profile::default()
            },
        );
        assert!(DressRule.accepts(&man, &woman));
        assert!(!MaritalStatusRule.accepts(&man, &woman));
    }

    #[test]
    fn test_rules_can_be_removed_and_added() {
        struct NeverOnTuesdays;
        impl CompatibilityRule for NeverOnTuesdays {
            fn name(&self) -> &'static str {
                "never"
            }
            fn accepts(&self, _: &Participant, _: &Participant) -> bool {
                false
            }
        }

        let kohen = attendee(Gender::Man, Profile { is_kohen: true, ..Profile::default() });
        let divorced = attendee(
            Gender::Woman,
            Profile { marital_status: Some(MaritalStatus::Divorced), ..Profile::default() },
        );
        let relaxed = CompatibilityFilter::default().without("kohen");
        assert_eq!(relaxed.check(&kohen, &divorced), Verdict::Match);

        let strict = CompatibilityFilter::empty().with_rule(NeverOnTuesdays);
        assert_eq!(strict.check(&kohen, &divorced), Verdict::Rejected { rule: "never" });
    }
}
