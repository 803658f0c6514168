use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, Ident, ItemFn, Pat, PathArguments,
    Signature, Type,
};

/// Turn an async test into a synchronous `#[test]` against a fresh database,
/// injecting its arguments and dropping the database however the test ends.
///
/// Arguments may be a [`rocket::local::asynchronous::Client`], a
/// [`mongodb::Database`], and any number of `Coll<T>`, in any order.
///
/// `#[backend_test(admin)]` and `#[backend_test(student)]` log the client in
/// first, as a freshly inserted example admin or student.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    let injected = match injected_args(&item_fn.sig) {
        Ok(injected) => injected,
        Err(err) => return err.into_compile_error().into(),
    };
    let arg_exprs = injected.iter().map(Injected::expr).collect::<Vec<_>>();

    // The async body keeps a different name so the test can have the original.
    let name = item_fn.sig.ident.clone();
    let body_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = body_name.clone();

    // Log in the client as admin/student if needed.
    let maybe_login = parse_macro_input!(args as Option<Ident>)
        .and_then(|arg| {
            if arg == "admin" {
                Some(quote! {
                    let admin = crate::model::db::admin::NewAdmin::try_from(
                        crate::model::api::admin::AdminCredentials::example(),
                    )
                    .unwrap();
                    crate::model::mongodb::Coll::<crate::model::db::admin::NewAdmin>::from_db(&db)
                        .insert_one(admin, None)
                        .await
                        .unwrap();

                    let response = rocket_client
                        .post("/auth")
                        .header(rocket::http::ContentType::JSON)
                        .body(rocket::serde::json::serde_json::json!(crate::model::api::login::LoginRequest::example_admin()).to_string())
                        .dispatch()
                        .await;
                    assert_eq!(rocket::http::Status::Ok, response.status(), "admin login failed");
                })
            } else if arg == "student" {
                Some(quote! {
                    let student = crate::model::db::student::NewStudent::example();
                    let login = crate::model::api::login::LoginRequest::example_student(&student.student_number);
                    crate::model::mongodb::Coll::<crate::model::db::student::NewStudent>::from_db(&db)
                        .insert_one(student, None)
                        .await
                        .unwrap();

                    let response = rocket_client
                        .post("/auth")
                        .header(rocket::http::ContentType::JSON)
                        .body(rocket::serde::json::serde_json::json!(login).to_string())
                        .dispatch()
                        .await;
                    assert_eq!(rocket::http::Status::Ok, response.status(), "student login failed");
                })
            } else {
                None
            }
        })
        .unwrap_or_default();

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            async fn setup() -> (rocket::local::asynchronous::Client, mongodb::Database) {
                log4rs_test_utils::test_logging::init_logging_once_for(["campus_vote"], None, None);
                let (rocket_client, db) = crate::test_support::setup().await;

                // Scoped so the login response releases its borrow of the client.
                {
                    #maybe_login
                }

                (rocket_client, db)
            }

            #item_fn

            async fn cleanup(db: mongodb::Database) {
                db.drop(None).await.unwrap();
            }

            // Create an async runtime. We need a separate one for inside and
            // outside the `catch_unwind`.
            let outer_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("test-setup-cleanup")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();
            let inner_runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            // Run the setup.
            let (rocket_client, db) = outer_runtime.block_on(setup());

            // Run the test, catching any panics.
            // Use mutexes to safely transfer `!UnwindSafe` data.
            let client_mutex = std::sync::Mutex::new(rocket_client);
            let db_mutex = std::sync::Mutex::new(db.clone());
            let runtime_mutex = std::sync::Mutex::new(inner_runtime);
            let result = std::panic::catch_unwind(|| {
                let rocket_client = client_mutex.into_inner().unwrap();
                let db = db_mutex.into_inner().unwrap();
                let runtime = runtime_mutex.into_inner().unwrap();

                runtime.block_on(#body_name(#(#arg_exprs),*));
            });

            // Run the cleanup.
            outer_runtime.block_on(cleanup(db));

            // If the test panicked, re-raise the panic.
            if let Err(cause) = result {
                std::panic::panic_any(cause);
            }
        }
    }
    .into()
}

/// One argument of the wrapped test.
enum Injected {
    Client,
    Database,
    Coll(Ident),
}

impl Injected {
    /// The expression passed for this argument.
    fn expr(&self) -> TokenStream2 {
        match self {
            Self::Client => quote! { rocket_client },
            Self::Database => quote! { db.clone() },
            Self::Coll(ty) => quote! { crate::model::mongodb::Coll::<#ty>::from_db(&db) },
        }
    }

    /// Work out what to inject for an argument of the given type.
    fn from_type(ty: &Type) -> Option<Self> {
        let path = match ty {
            Type::Path(type_path) => &type_path.path,
            _ => return None,
        };
        if path.is_ident("Client") {
            return Some(Self::Client);
        }
        if path.is_ident("Database") {
            return Some(Self::Database);
        }
        let last = path.segments.last()?;
        if last.ident != "Coll" {
            return None;
        }
        match &last.arguments {
            PathArguments::AngleBracketed(generics) => match generics.args.first() {
                Some(GenericArgument::Type(Type::Path(inner))) => {
                    inner.path.get_ident().cloned().map(Self::Coll)
                }
                _ => None,
            },
            _ => None,
        }
    }
}

/// Check the test is async and work out what each argument should receive.
fn injected_args(sig: &Signature) -> Result<Vec<Injected>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut injected = Vec::new();
    for input in &sig.inputs {
        let arg = match input {
            FnArg::Typed(pat_type) if matches!(&*pat_type.pat, Pat::Ident(_)) => {
                Injected::from_type(&pat_type.ty)
            }
            _ => None,
        };
        let arg = arg.ok_or_else(|| {
            syn::Error::new(
                input.span(),
                "Expected one of `client: Client`, `db: Database` or `collection: Coll<T>`",
            )
        })?;

        let duplicate = match arg {
            Injected::Client => injected.iter().any(|a| matches!(a, Injected::Client)),
            Injected::Database => injected.iter().any(|a| matches!(a, Injected::Database)),
            Injected::Coll(_) => false,
        };
        if duplicate {
            return Err(syn::Error::new(
                input.span(),
                "Test cannot take more than one `Client` or `Database`",
            ));
        }
        injected.push(arg);
    }

    Ok(injected)
}
