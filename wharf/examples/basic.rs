//! Basic example of the Wharf scoped container.
//!
//! Run with `RUST_LOG=wharf_container=debug cargo run --example basic`.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;
use wharf::prelude::*;

// === Define your types ===

/// Collects query lines so the example can print them at the end.
#[derive(Default)]
struct Journal {
    lines: Mutex<Vec<String>>,
}

impl Journal {
    fn write(&self, line: String) {
        self.lines.lock().push(line);
    }
}

struct Database {
    dsn: String,
    journal: Arc<Journal>,
}

impl Database {
    fn query(&self, sql: &str) -> String {
        self.journal.write(format!("[{}] {sql}", self.dsn));
        format!("rows from {}", self.dsn)
    }
}

struct RequestContext {
    path: String,
}

struct UserController {
    db: Arc<Database>,
    request: Arc<RequestContext>,
}

impl UserController {
    fn show(&self, id: u64) -> String {
        self.db
            .query(&format!("SELECT * FROM users WHERE id = {id} -- {}", self.request.path))
    }
}

fn main() -> Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let container = ScopedContainer::new().with_parameters(
        [("db.name", "app"), ("db.dsn", "mysql://localhost/%db.name%")]
            .into_iter()
            .collect(),
    );
    container.register_scope("request", Scope::nesting(ServiceBuilder::new()), 1)?;

    // Journal: container scope, shared by everything
    container.register_descriptor("journal", ServiceDescriptor::from_fn(|_| Ok(Journal::default())))?;

    // Database: container scope, depends on a parameter and the journal
    container.register_descriptor(
        "database",
        ServiceDescriptor::from_factory(|args, _| {
            Ok(Database {
                dsn: args.string(0)?,
                journal: args.service(1)?,
            })
        })
        .arg(Argument::parameter("db.dsn"))
        .arg(Reference::new("journal")),
    )?;

    // Controller: one per request
    container.register_descriptor(
        "user_controller",
        ServiceDescriptor::from_fn(|r| {
            Ok(UserController {
                db: resolve(r, "database")?,
                request: resolve(r, "request")?,
            })
        })
        .scope("request"),
    )?;
    container.set_alias("controller", "user_controller")?;

    container.compile()?;
    println!("✅ Container compiled: {container:?}");

    for (n, path) in ["/users/42", "/users/7"].into_iter().enumerate() {
        let _session = Session::enter(&container, "request")?;
        container.set(
            "request",
            Arc::new(RequestContext {
                path: path.to_string(),
            }),
            Some("request"),
        )?;

        let controller: Arc<UserController> = container.get_as("controller")?;
        println!("👤 {}", controller.show(n as u64 + 1));
    }
    // sessions dropped: controllers and request contexts are gone

    let journal: Arc<Journal> = container.get_as("journal")?;
    for line in journal.lines.lock().iter() {
        println!("📋 {line}");
    }

    match container.get("request", InvalidBehavior::Fail) {
        Err(err) => println!("\n❌ Outside a request:\n{err}"),
        Ok(_) => println!("\n⚠️ request leaked out of its session"),
    }

    Ok(())
}
