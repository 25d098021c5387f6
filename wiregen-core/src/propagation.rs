//! Error and cleanup propagation.
//!
//! Decides, for every construction site in order, whether it needs an
//! inline error check and whether it registers a release action.
//!
//! Release actions are registered the moment their value is built. A
//! failure unwinds every action registered before it, latest first; the
//! failing site's own action is never registered.

use tracing::{debug, warn};

use crate::error::{Diagnostic, InjectorCannotFailError, Result};
use crate::injector::InjectorSpec;
use crate::provider::Provider;

/// Obligations of one construction site.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SiteEffects {
    /// Positions of earlier sites to unwind on failure, latest first.
    /// `None` when the site cannot fail.
    pub error_check: Option<Vec<usize>>,
    /// The site registers a release action.
    pub registers_cleanup: bool,
}

/// Effects of every site plus the aggregate cleanup order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Propagation {
    pub sites: Vec<SiteEffects>,
    /// Positions of the sites whose actions the aggregate handle runs,
    /// latest first.
    pub cleanup_order: Vec<usize>,
}

/// Plans error checks and cleanup registrations for `sites`, given in
/// construction order.
///
/// # Errors
/// [`Diagnostic::InjectorCannotFail`] for the first fallible provider when
/// the injector has no error channel.
pub fn plan_propagation(spec: &InjectorSpec, sites: &[&Provider]) -> Result<Propagation> {
    if !spec.is_error_capable() {
        if let Some(provider) = sites.iter().find(|p| p.can_fail()) {
            warn!(
                injector = spec.name(),
                provider = provider.id(),
                "Fallible provider in an injector without an error result"
            );
            return Err(Diagnostic::InjectorCannotFail(InjectorCannotFailError {
                injector: spec.name().to_string(),
                provider: provider.id().to_string(),
            }));
        }
    }

    let mut registered: Vec<usize> = Vec::new();
    let mut effects = Vec::with_capacity(sites.len());

    for (position, provider) in sites.iter().enumerate() {
        let error_check = provider
            .can_fail()
            .then(|| registered.iter().rev().copied().collect::<Vec<_>>());

        if provider.has_cleanup() {
            registered.push(position);
        }

        effects.push(SiteEffects {
            error_check,
            registers_cleanup: provider.has_cleanup(),
        });
    }

    registered.reverse();
    debug!(
        checks = effects.iter().filter(|e| e.error_check.is_some()).count(),
        cleanups = registered.len(),
        "Propagation planned"
    );

    Ok(Propagation {
        sites: effects,
        cleanup_order: registered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;

    fn provider(id: &str, can_fail: bool, cleanup: bool) -> Provider {
        let mut p = Provider::function(id, Vec::<&str>::new(), id.to_uppercase());
        if can_fail {
            p = p.fallible();
        }
        if cleanup {
            p = p.with_cleanup();
        }
        p
    }

    #[test]
    fn plain_sites_have_no_effects() {
        let a = provider("a", false, false);
        let spec = InjectorSpec::new("init");

        let plan = plan_propagation(&spec, &[&a]).unwrap();
        assert_eq!(plan.sites, vec![SiteEffects::default()]);
        assert!(plan.cleanup_order.is_empty());
    }

    #[test]
    fn failure_unwinds_earlier_cleanups_in_reverse() {
        let file = provider("file", true, true);
        let conn = provider("conn", false, true);
        let plain = provider("plain", false, false);
        let server = provider("server", true, true);
        let spec = InjectorSpec::new("init").error_capable(true);

        let plan = plan_propagation(&spec, &[&file, &conn, &plain, &server]).unwrap();

        // a failing site never unwinds its own cleanup
        assert_eq!(plan.sites[0].error_check, Some(vec![]));
        assert_eq!(plan.sites[1].error_check, None);
        assert_eq!(plan.sites[3].error_check, Some(vec![1, 0]));
        assert!(plan.sites[3].registers_cleanup);
        assert_eq!(plan.cleanup_order, vec![3, 1, 0]);
    }

    #[test]
    fn infallible_injector_rejects_fallible_provider() {
        let ok = provider("ok", false, false);
        let risky = provider("risky", true, false);
        let spec = InjectorSpec::new("init");

        let err = plan_propagation(&spec, &[&ok, &risky]).unwrap_err();
        assert_eq!(err.kind(), DiagnosticKind::InjectorCannotFail);
        match err {
            Diagnostic::InjectorCannotFail(e) => assert_eq!(e.provider, "risky"),
            other => panic!("Expected InjectorCannotFail, got: {other:?}"),
        }
    }

    #[test]
    fn infallible_injector_may_still_clean_up() {
        let res = provider("res", false, true);
        let spec = InjectorSpec::new("init");

        let plan = plan_propagation(&spec, &[&res]).unwrap();
        assert_eq!(plan.cleanup_order, vec![0]);
    }
}
