use wiregen::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    wiregen::logging::init("wiregen_core=debug")?;

    let greeter = ProviderSet::new("GreeterSet")
        .provider(Provider::function("app::new_message", ["String"], "app::Message"))
        .provider(Provider::function("app::new_greeter", ["app::Message"], "app::Greeter"))
        .provider(Provider::function("app::new_event", ["app::Greeter"], "app::Event").fallible());

    let storage = ProviderSet::new("StorageSet")
        .provider(Provider::value("u16", "8080"))
        .provider(Provider::function("db::open", ["u16"], "db::Pool").fallible().with_cleanup())
        .provider(Provider::bind("dyn db::Store", "db::Pool"))
        .provider(Provider::structure("app::Server", [("store", "dyn db::Store"), ("event", "app::Event")]));

    let app = ProviderSet::new("AppSet").include(greeter).include(storage);

    let options = GenerateOptions::default().unused_scope(UnusedScope::Run);
    let mut builder = Catalog::configured(&options);
    builder.add_set(&app)?;
    let generator = Generator::new(builder.build()).with_options(options);

    let injectors = [
        InjectorSpec::new("initialize_event")
            .input("phrase", "String")
            .output("app::Event")
            .error_capable(true),
        InjectorSpec::new("initialize_server")
            .input("phrase", "String")
            .output("app::Server")
            .error_capable(true),
    ];

    let report = generator.generate_all(&injectors);
    for plan in report.plans() {
        println!("{plan}\n");
    }
    for (injector, diagnostic) in report.diagnostics() {
        eprintln!("{injector}: {diagnostic}");
    }

    std::process::exit(report.exit_code());
}
