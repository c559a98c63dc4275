use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use waypoint::http::{Method, Request, Response, StatusCode};
use waypoint::router::{Context, RouteError, Router, Target};
use waypoint::RouterOptions;

fn send(router: &Router, method: Method, target: &str) -> Response {
    router.dispatch(Request::new(method, target))
}

fn get(router: &Router, target: &str) -> Response {
    send(router, Method::GET, target)
}

fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

fn counting_middleware(hits: &Arc<AtomicUsize>) -> Target {
    let hits = Arc::clone(hits);
    Target::middleware(move |ctx| {
        hits.fetch_add(1, Ordering::SeqCst);
        ctx.next();
        Ok(())
    })
}

#[test]
fn test_root_and_param_scenario() {
    let mut router = Router::new();
    router.get("/", |ctx| {
        ctx.text("root");
        Ok(())
    });
    router.get("/:foo", |ctx| {
        let body = format!("foo={}", ctx.param("foo").unwrap_or_default());
        ctx.text(body);
        Ok(())
    });

    let res = get(&router, "/bar");
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body_text(), "foo=bar");

    let res = get(&router, "/");
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body_text(), "root");

    let res = get(&router, "/foo/bar");
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body_text(), "Not Found");
}

#[test]
fn test_trailing_slash_loose_by_default() {
    let mut router = Router::new();
    router.get("/about", |ctx| {
        ctx.text("about");
        Ok(())
    });

    assert_eq!(get(&router, "/about").status, StatusCode::OK);
    assert_eq!(get(&router, "/about/").status, StatusCode::OK);
    assert_eq!(get(&router, "/about//").status, StatusCode::NOT_FOUND);
}

#[test]
fn test_trailing_slash_strict() {
    let mut router = Router::with_options(RouterOptions {
        strict: true,
        ..RouterOptions::default()
    });
    router.get("/about", |ctx| {
        ctx.text("about");
        Ok(())
    });
    router.get("/dir/", |ctx| {
        ctx.text("dir");
        Ok(())
    });

    assert_eq!(get(&router, "/about").status, StatusCode::OK);
    assert_eq!(get(&router, "/about/").status, StatusCode::NOT_FOUND);
    // "/dir/" registers the same as "/dir"
    assert_eq!(get(&router, "/dir").status, StatusCode::OK);
    assert_eq!(get(&router, "/dir/").status, StatusCode::NOT_FOUND);
}

#[test]
fn test_case_sensitivity_option() {
    let mut loose = Router::new();
    loose.get("/Users", |ctx| {
        ctx.text("users");
        Ok(())
    });
    assert_eq!(get(&loose, "/users").status, StatusCode::OK);

    let mut sensitive = Router::with_options(RouterOptions {
        case_sensitive: true,
        ..RouterOptions::default()
    });
    sensitive.get("/Users", |ctx| {
        ctx.text("users");
        Ok(())
    });
    assert_eq!(get(&sensitive, "/users").status, StatusCode::NOT_FOUND);
    assert_eq!(get(&sensitive, "/Users").status, StatusCode::OK);
}

#[test]
fn test_middleware_covers_prefix_and_sub_paths() {
    let hits = counter();
    let mut router = Router::new();
    router.attach_at("/p", counting_middleware(&hits));

    for path in ["/p", "/p/", "/p/x", "/p/x/y"] {
        get(&router, path);
    }
    assert_eq!(hits.load(Ordering::SeqCst), 4);

    get(&router, "/q");
    get(&router, "/px");
    assert_eq!(hits.load(Ordering::SeqCst), 4);
}

#[test]
fn test_middleware_then_head_handler_scenario() {
    let hits = counter();
    let mut router = Router::new();
    router.attach_at("/v2", counting_middleware(&hits));
    router.head("/v2", |ctx| {
        ctx.send(StatusCode::NO_CONTENT, "");
        Ok(())
    });

    let res = get(&router, "/v2/anything");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    get(&router, "/v3");
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let res = send(&router, Method::HEAD, "/v2");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(res.status, StatusCode::NO_CONTENT);
}

#[test]
fn test_method_filtering() {
    let mut router = Router::new();
    router.get("/item", |ctx| {
        ctx.text("get");
        Ok(())
    });
    router.delete("/item", |ctx| {
        ctx.text("delete");
        Ok(())
    });
    router.all("/any", |ctx| {
        let body = ctx.method().to_string();
        ctx.text(body);
        Ok(())
    });

    assert_eq!(get(&router, "/item").body_text(), "get");
    assert_eq!(send(&router, Method::DELETE, "/item").body_text(), "delete");
    assert_eq!(send(&router, Method::POST, "/item").status, StatusCode::NOT_FOUND);

    for method in [Method::GET, Method::PUT, Method::PATCH, Method::OPTIONS] {
        let res = send(&router, method, "/any");
        assert_eq!(res.body_text(), method.as_str());
    }
}

#[test]
fn test_handle_with_explicit_method() {
    let mut router = Router::new();
    router.handle(Method::PUT, "/doc/:id", |ctx| {
        let body = format!("put {}", ctx.param("id").unwrap_or_default());
        ctx.text(body);
        Ok(())
    });
    router.post("/doc", |ctx| {
        ctx.send(StatusCode::CREATED, "created");
        Ok(())
    });
    router.patch("/doc/:id", |ctx| {
        ctx.text("patched");
        Ok(())
    });
    router.options("/doc", |ctx| {
        ctx.set_header("Allow", "POST, OPTIONS");
        ctx.send(StatusCode::NO_CONTENT, "");
        Ok(())
    });

    assert_eq!(send(&router, Method::PUT, "/doc/9").body_text(), "put 9");
    assert_eq!(send(&router, Method::POST, "/doc").status, StatusCode::CREATED);
    assert_eq!(send(&router, Method::PATCH, "/doc/9").body_text(), "patched");
    let res = send(&router, Method::OPTIONS, "/doc");
    assert_eq!(res.headers.get("Allow").map(String::as_str), Some("POST, OPTIONS"));
}

#[test]
fn test_chain_runs_in_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut router = Router::new();

    for name in ["first", "second"] {
        let log = Arc::clone(&log);
        router.attach(Target::middleware(move |ctx| {
            log.lock().unwrap().push(name);
            ctx.next();
            Ok(())
        }));
    }
    let handler_log = Arc::clone(&log);
    router.get("/", move |ctx| {
        handler_log.lock().unwrap().push("handler");
        ctx.text("done");
        Ok(())
    });
    let late = Arc::clone(&log);
    router.attach(Target::middleware(move |ctx| {
        late.lock().unwrap().push("late");
        ctx.next();
        Ok(())
    }));

    assert_eq!(get(&router, "/").body_text(), "done");
    assert_eq!(*log.lock().unwrap(), vec!["first", "second", "handler"]);
}

#[test]
fn test_middleware_without_next_ends_chain() {
    let reached = counter();
    let mut router = Router::new();
    router.attach(Target::middleware(|ctx| {
        ctx.send(StatusCode::UNAUTHORIZED, "login first");
        Ok(())
    }));
    let seen = Arc::clone(&reached);
    router.get("/", move |ctx| {
        seen.fetch_add(1, Ordering::SeqCst);
        ctx.text("secret");
        Ok(())
    });

    let res = get(&router, "/");
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body_text(), "login first");
    assert_eq!(reached.load(Ordering::SeqCst), 0);
}

#[test]
fn test_finished_response_is_not_replaced_by_404() {
    let mut router = Router::new();
    router.attach(Target::middleware(|ctx| {
        ctx.text("early");
        ctx.next();
        Ok(())
    }));

    let res = get(&router, "/nothing/here");
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body_text(), "early");
}

#[test]
fn test_unfinished_response_gets_404_with_middleware_headers() {
    let mut router = Router::new();
    router.attach(Target::middleware(|ctx| {
        ctx.set_header("X-Request-Id", "r-1");
        ctx.next();
        Ok(())
    }));

    let res = get(&router, "/missing");
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.headers.get("X-Request-Id").map(String::as_str), Some("r-1"));
}

#[test]
fn test_handler_that_never_writes_returns_default_response() {
    let mut router = Router::new();
    router.get("/quiet", |_| Ok(()));

    let res = get(&router, "/quiet");
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.is_empty());
}

#[test]
fn test_values_flow_from_middleware_to_handler() {
    struct User(String);

    let mut router = Router::new();
    router.attach(Target::middleware(|ctx| {
        let name = ctx.request().header("X-User").unwrap_or("anonymous").to_string();
        ctx.insert(User(name));
        ctx.next();
        Ok(())
    }));
    router.get("/me", |ctx| {
        let body = ctx.get::<User>().map(|u| u.0.clone()).unwrap_or_default();
        ctx.text(body);
        Ok(())
    });

    let mut req = Request::new(Method::GET, "/me");
    req.headers.insert("X-User".into(), "ada".into());
    assert_eq!(router.dispatch(req).body_text(), "ada");
    assert_eq!(get(&router, "/me").body_text(), "anonymous");
}

#[test]
fn test_middleware_sees_wildcard_remainder() {
    let mut router = Router::new();
    router.attach_at("/static", Target::middleware(|ctx| {
        let body = format!("file={}", ctx.wildcard(0).unwrap_or_default());
        ctx.text(body);
        Ok(())
    }));

    assert_eq!(get(&router, "/static/css/site.css").body_text(), "file=css/site.css");
    assert_eq!(get(&router, "/static").body_text(), "file=");
}

#[test]
fn test_explicit_wildcard_route() {
    let mut router = Router::new();
    router.get("/files/*", |ctx| {
        let body = ctx.wildcard(0).unwrap_or_default().to_string();
        ctx.text(body);
        Ok(())
    });
    router.get(r"/items/:n(\d+)", |ctx| {
        let body = format!("item {}", ctx.param("n").unwrap_or_default());
        ctx.text(body);
        Ok(())
    });

    assert_eq!(get(&router, "/files/a/b").body_text(), "a/b");
    assert_eq!(get(&router, "/items/12").body_text(), "item 12");
    assert_eq!(get(&router, "/items/twelve").status, StatusCode::NOT_FOUND);
}

#[test]
fn test_query_string_is_not_matched() {
    let mut router = Router::new();
    router.get("/search", |ctx| {
        let body = ctx.request().query_param("q").unwrap_or_default();
        ctx.text(body);
        Ok(())
    });

    assert_eq!(get(&router, "/search?q=rust").body_text(), "rust");
}

#[test]
fn test_long_chain_does_not_grow_the_stack() {
    let hits = counter();
    let mut router = Router::new();
    for _ in 0..10_000 {
        router.attach(counting_middleware(&hits));
    }
    router.get("/", |ctx: &mut Context| -> Result<(), RouteError> {
        ctx.text("bottom");
        Ok(())
    });

    let res = get(&router, "/");
    assert_eq!(res.body_text(), "bottom");
    assert_eq!(hits.load(Ordering::SeqCst), 10_000);
}

#[test]
fn test_handle_context_with_caller_owned_context() {
    let mut router = Router::new();
    router.get("/ctx", |ctx| {
        ctx.text("via context");
        Ok(())
    });

    let mut ctx = Context::new(Request::new(Method::GET, "/ctx"));
    router.handle_context(&mut ctx);
    assert!(ctx.is_finished());
    assert_eq!(ctx.response().body_text(), "via context");
}

#[test]
fn test_non_ascii_and_space_literals_match() {
    let mut router = Router::new();
    router.get("/caf\u{e9}", |ctx| {
        ctx.text("coffee");
        Ok(())
    });
    router.get("/a b", |ctx| {
        ctx.text("spaced");
        Ok(())
    });

    assert_eq!(get(&router, "/caf\u{e9}").body_text(), "coffee");
    assert_eq!(get(&router, "/caf%C3%A9").body_text(), "coffee");
    assert_eq!(get(&router, "/a b").body_text(), "spaced");
    assert_eq!(get(&router, "/a%20b").body_text(), "spaced");
}

#[test]
fn test_non_ascii_param_is_decoded() {
    let mut router = Router::new();
    router.get("/users/:name", |ctx| {
        let body = ctx.param("name").unwrap_or_default().to_string();
        ctx.text(body);
        Ok(())
    });

    assert_eq!(get(&router, "/users/jos\u{e9}").body_text(), "jos\u{e9}");
}

#[test]
fn test_escaped_star_middleware_still_covers_sub_paths() {
    let hits = counter();
    let mut router = Router::new();
    router.attach_at(r"/a\*", counting_middleware(&hits));

    get(&router, "/a*/x");
    get(&router, "/a*");
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    get(&router, "/ab");
    get(&router, "/a/x");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn test_custom_expression_keeps_double_slash() {
    let mut router = Router::new();
    router.get("/p/:x(a//b)", |ctx| {
        let body = ctx.param("x").unwrap_or_default().to_string();
        ctx.text(body);
        Ok(())
    });

    assert_eq!(get(&router, "/p/a//b").body_text(), "a//b");
    assert_eq!(get(&router, "/p/a/b").status, StatusCode::NOT_FOUND);
}
