//! # wiregen — compile-time dependency injection
//!
//! Resolves injector signatures against a catalog of providers and emits
//! a deterministic construction plan for each one: which providers to call,
//! in which order, where to check for errors and which release actions to
//! unwind when a step fails.
//!
//! ```rust
//! use wiregen::prelude::*;
//!
//! let set = ProviderSet::new("GreeterSet")
//!     .provider(Provider::function("app::new_message", Vec::<&str>::new(), "app::Message"))
//!     .provider(Provider::function("app::new_greeter", ["app::Message"], "app::Greeter"));
//!
//! let generator = Generator::new(Catalog::from_set(&set).unwrap());
//! let report = generator.generate_all(&[InjectorSpec::new("init").output("app::Greeter")]);
//!
//! assert_eq!(report.exit_code(), 0);
//! println!("{}", report.plans().next().unwrap());
//! ```

pub use wiregen_core::*;
pub use wiregen_support::{naming, rendering};

pub mod logging {
    //! Log output for generation runs.

    use tracing_subscriber::EnvFilter;

    pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

    /// Default directive: progress of runs, details of failures.
    pub const DEFAULT_FILTER: &str = "wiregen=info,wiregen_core=info";

    /// Installs a formatting subscriber filtered by `filter`
    /// (`RUST_LOG` syntax, e.g. `"wiregen_core=debug"`).
    ///
    /// # Errors
    /// Fails if `filter` does not parse or a global subscriber is already
    /// installed.
    pub fn init(filter: &str) -> Result<(), Error> {
        let filter = EnvFilter::try_new(filter)?;
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    }

    /// Like [`init`], taking the filter from `RUST_LOG` when it is set.
    ///
    /// # Errors
    /// See [`init`].
    pub fn init_from_env() -> Result<(), Error> {
        let filter = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| DEFAULT_FILTER.to_string());
        init(&filter)
    }
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn facade_exposes_the_pipeline() {
        let set = ProviderSet::new("Set")
            .provider(Provider::function("new_config", Vec::<&str>::new(), "Config"))
            .provider(Provider::function("new_db", ["Config"], "Db").fallible().with_cleanup());
        let generator = Generator::new(Catalog::from_set(&set).unwrap());
        let spec = InjectorSpec::new("init_db").output("Db").error_capable(true);

        let plan = generator.generate(&spec).unwrap();
        assert_eq!(plan.cleanups, vec!["cleanup".to_string()]);
        assert_eq!(
            plan.to_string(),
            "init_db()\n\
             [call] config = new_config()\n\
             [call] db = new_db(config)  (check err, cleanup cleanup)\n\
             return db + cleanup [cleanup]"
        );
    }

    #[test]
    fn bad_filter_is_rejected() {
        assert!(super::logging::init("wiregen=notalevel").is_err());
    }

    #[test]
    fn report_as_json() {
        let generator = Generator::new(Catalog::builder().build());
        let report = generator.generate_all(&[InjectorSpec::new("init").output("Missing")]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcomes"][0]["result"]["Err"][0]["kind"], "no_provider_found");
        assert_eq!(report.exit_code(), 1);
    }
}
