//! Registration page classification. The service serves several generations
//! of the activation form depending on tenant configuration and account
//! state; the flow has to recognize which one it landed on before touching
//! any field.

use crate::dom::PageEvidence;

/// The four known activation page shapes, plus a catch-all. Each variant
/// carries the evidence it was classified from so outcomes can explain
/// themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageVariant {
    /// Email plus terms first, password on a follow-up screen.
    TwoStepNew(PageEvidence),
    /// Everything on one screen: names, password, terms.
    SingleStepNew(PageEvidence),
    /// The pre-redesign form with FirstName/LastName/Email/ConfirmEmail.
    OldForm(PageEvidence),
    /// The address already has an active account; the page offers sign-in.
    AlreadyRegistered(PageEvidence),
    Unknown(PageEvidence),
}

impl PageVariant {
    pub fn name(&self) -> &'static str {
        match self {
            PageVariant::TwoStepNew(_) => "two_step_new",
            PageVariant::SingleStepNew(_) => "single_step_new",
            PageVariant::OldForm(_) => "old_form",
            PageVariant::AlreadyRegistered(_) => "already_registered",
            PageVariant::Unknown(_) => "unknown",
        }
    }

    pub fn evidence(&self) -> &PageEvidence {
        match self {
            PageVariant::TwoStepNew(e)
            | PageVariant::SingleStepNew(e)
            | PageVariant::OldForm(e)
            | PageVariant::AlreadyRegistered(e)
            | PageVariant::Unknown(e) => e,
        }
    }
}

/// Ordered classification over field evidence. Rules are checked most
/// specific first; the first match wins, so a page can never yield two
/// variants.
pub fn classify(evidence: PageEvidence) -> PageVariant {
    if evidence.has_email_input
        && evidence.has_general_terms_checkbox
        && !evidence.has_password_input
    {
        return PageVariant::TwoStepNew(evidence);
    }
    if evidence.has_password_input && evidence.checkbox_count >= 1 {
        return PageVariant::SingleStepNew(evidence);
    }
    if evidence.has_legacy_fields {
        return PageVariant::OldForm(evidence);
    }
    if evidence.has_signin_affordance && !evidence.has_password_input {
        return PageVariant::AlreadyRegistered(evidence);
    }
    PageVariant::Unknown(evidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_and_terms_without_password_is_two_step() {
        let evidence = PageEvidence {
            has_email_input: true,
            has_general_terms_checkbox: true,
            checkbox_count: 2,
            ..Default::default()
        };
        let variant = classify(evidence);
        assert!(matches!(variant, PageVariant::TwoStepNew(_)));
        assert_eq!(variant.name(), "two_step_new");
    }

    #[test]
    fn password_with_checkbox_is_single_step() {
        let evidence = PageEvidence {
            has_password_input: true,
            has_first_name_input: true,
            has_last_name_input: true,
            checkbox_count: 1,
            has_general_terms_checkbox: true,
            ..Default::default()
        };
        assert!(matches!(classify(evidence), PageVariant::SingleStepNew(_)));
    }

    #[test]
    fn legacy_fields_yield_old_form() {
        let evidence = PageEvidence {
            has_legacy_fields: true,
            ..Default::default()
        };
        assert!(matches!(classify(evidence), PageVariant::OldForm(_)));
    }

    #[test]
    fn signin_without_password_is_already_registered() {
        let evidence = PageEvidence {
            has_signin_affordance: true,
            ..Default::default()
        };
        assert!(matches!(classify(evidence), PageVariant::AlreadyRegistered(_)));
    }

    #[test]
    fn empty_evidence_is_unknown() {
        assert!(matches!(
            classify(PageEvidence::default()),
            PageVariant::Unknown(_)
        ));
    }

    #[test]
    fn single_step_wins_over_signin_link_on_same_page() {
        // Registration pages often carry a "sign in instead" link; the
        // password field decides.
        let evidence = PageEvidence {
            has_password_input: true,
            checkbox_count: 1,
            has_signin_affordance: true,
            ..Default::default()
        };
        assert!(matches!(classify(evidence), PageVariant::SingleStepNew(_)));
    }

    #[test]
    fn classification_is_deterministic_over_same_markup() {
        let html = r#"
            <input type="email" name="email" />
            <input type="checkbox" name="generalTerms" />
            <button type="submit">Continue</button>
        "#;
        let first = classify(PageEvidence::collect(html));
        let second = classify(PageEvidence::collect(html));
        assert_eq!(first, second);
    }
}
