//! Suspension behavior: awaitables, the two iteration and resource
//! protocols, and cancellation unwinding.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use brook_eval::ast::{BinOp, Expr, Parameter, Stmt, Target, WithItem};
use brook_eval::{
    builtins, eval, ContextManager, EvalError, Protocol, Scope, Value, ValueStream,
};

type Events = Arc<Mutex<Vec<String>>>;

fn tracking_manager(name: &str, protocol: Protocol, events: Events, yielded: Value) -> Value {
    let acquire_events = events.clone();
    let acquire_name = name.to_string();
    let release_name = name.to_string();
    Value::ContextManager(Arc::new(ContextManager::new(
        name,
        protocol,
        move || {
            let events = acquire_events.clone();
            let name = acquire_name.clone();
            let yielded = yielded.clone();
            async move {
                events.lock().unwrap().push(format!("acquire {name}"));
                Ok(yielded)
            }
        },
        move |body_error: Option<EvalError>| {
            let events = events.clone();
            let name = release_name.clone();
            async move {
                let suffix = match body_error {
                    Some(_) => " (after error)",
                    None => "",
                };
                events.lock().unwrap().push(format!("release {name}{suffix}"));
                Ok(())
            }
        },
    )))
}

fn failing_release_manager(name: &str, protocol: Protocol) -> Value {
    Value::ContextManager(Arc::new(ContextManager::new(
        name,
        protocol,
        || async { Ok(Value::None) },
        |_body_error| async {
            Err(EvalError::ValueError {
                message: "release failed".into(),
            })
        },
    )))
}

async fn run(program: Vec<Stmt>) -> Result<(Value, Arc<Scope>), EvalError> {
    let scope = Scope::new_module();
    builtins::install(&scope).await;
    let result = eval(&program, scope.clone(), None).await?;
    Ok((result, scope))
}

#[tokio::test]
async fn awaiting_an_async_function_runs_its_body() {
    let (_, scope) = run(vec![
        Stmt::FunctionDef {
            name: "five".into(),
            params: vec![],
            body: vec![Stmt::Return(Some(Expr::int(5)))].into(),
            is_async: true,
        },
        Stmt::assign("r", Expr::await_(Expr::call_name("five", vec![]))),
    ])
    .await
    .unwrap();
    assert_eq!(scope.get("r").await, Some(Value::Int(5)));
}

#[tokio::test]
async fn calling_an_async_function_without_await_yields_a_coroutine() {
    let (_, scope) = run(vec![
        Stmt::FunctionDef {
            name: "five".into(),
            params: vec![],
            body: vec![Stmt::Return(Some(Expr::int(5)))].into(),
            is_async: true,
        },
        Stmt::assign("c", Expr::call_name("five", vec![])),
    ])
    .await
    .unwrap();
    assert!(matches!(scope.get("c").await, Some(Value::Coroutine(_))));
}

#[tokio::test]
async fn arguments_bind_at_call_time_not_await_time() {
    // x is rebound between the call and the await; the coroutine holds the
    // value from the call site
    let (_, scope) = run(vec![
        Stmt::FunctionDef {
            name: "echo".into(),
            params: vec![Parameter::required("v")],
            body: vec![Stmt::Return(Some(Expr::name("v")))].into(),
            is_async: true,
        },
        Stmt::assign("x", Expr::int(1)),
        Stmt::assign("c", Expr::call_name("echo", vec![Expr::name("x")])),
        Stmt::assign("x", Expr::int(2)),
        Stmt::assign("r", Expr::await_(Expr::name("c"))),
    ])
    .await
    .unwrap();
    assert_eq!(scope.get("r").await, Some(Value::Int(1)));
}

#[tokio::test]
async fn awaiting_a_coroutine_twice_is_a_value_error() {
    let err = run(vec![
        Stmt::FunctionDef {
            name: "f".into(),
            params: vec![],
            body: vec![Stmt::Pass].into(),
            is_async: true,
        },
        Stmt::assign("c", Expr::call_name("f", vec![])),
        Stmt::expr(Expr::await_(Expr::name("c"))),
        Stmt::expr(Expr::await_(Expr::name("c"))),
    ])
    .await
    .unwrap_err();
    assert!(matches!(err, EvalError::ValueError { .. }));
}

#[tokio::test]
async fn awaiting_a_plain_value_is_a_type_error() {
    let err = run(vec![Stmt::expr(Expr::await_(Expr::int(3)))])
        .await
        .unwrap_err();
    let EvalError::TypeError { expected, .. } = err else {
        panic!("expected a type error");
    };
    assert_eq!(expected, "awaitable");
}

#[tokio::test(start_paused = true)]
async fn await_inside_a_loop_body_suspends_and_resumes() {
    let (_, scope) = run(vec![
        Stmt::assign("total", Expr::int(0)),
        Stmt::For {
            target: Target::name("i"),
            iter: Expr::call_name("range", vec![Expr::int(3)]),
            body: vec![
                Stmt::expr(Expr::await_(Expr::call_name(
                    "sleep",
                    vec![Expr::float(0.01)],
                ))),
                Stmt::AugAssign {
                    target: Target::name("total"),
                    op: BinOp::Add,
                    value: Expr::name("i"),
                },
            ],
            is_async: false,
        },
    ])
    .await
    .unwrap();
    assert_eq!(scope.get("total").await, Some(Value::Int(3)));
}

#[tokio::test]
async fn async_for_consumes_an_async_iterator() {
    let scope = Scope::new_module();
    builtins::install(&scope).await;
    scope
        .set(
            "source",
            Value::AsyncIterator(Arc::new(ValueStream::from_values(
                "source",
                vec![Value::Int(1), Value::Int(2), Value::Int(3)],
            ))),
        )
        .await;

    let program = vec![
        Stmt::assign("total", Expr::int(0)),
        Stmt::For {
            target: Target::name("i"),
            iter: Expr::name("source"),
            body: vec![Stmt::AugAssign {
                target: Target::name("total"),
                op: BinOp::Add,
                value: Expr::name("i"),
            }],
            is_async: true,
        },
    ];
    eval(&program, scope.clone(), None).await.unwrap();
    assert_eq!(scope.get("total").await, Some(Value::Int(6)));
}

#[tokio::test(start_paused = true)]
async fn async_for_suspends_before_each_element_without_reordering() {
    use futures_util::StreamExt;

    let stream = futures_util::stream::iter(vec![1i64, 2, 3])
        .then(|i| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(Value::Int(i))
        })
        .boxed();

    let scope = Scope::new_module();
    scope
        .set(
            "source",
            Value::AsyncIterator(Arc::new(ValueStream::new("source", stream))),
        )
        .await;
    scope.set("seen", Value::List(Arc::new(tokio::sync::RwLock::new(vec![])))).await;

    let program = vec![Stmt::For {
        target: Target::name("i"),
        iter: Expr::name("source"),
        body: vec![Stmt::expr(Expr::method(
            Expr::name("seen"),
            "append",
            vec![Expr::name("i")],
        ))],
        is_async: true,
    }];
    eval(&program, scope.clone(), None).await.unwrap();

    let Some(Value::List(seen)) = scope.get("seen").await else {
        panic!("'seen' is not a list");
    };
    let seen = seen.read().await;
    assert_eq!(*seen, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
}

#[tokio::test]
async fn async_for_over_a_plain_list_is_a_type_error() {
    let err = run(vec![Stmt::For {
        target: Target::name("i"),
        iter: Expr::List(vec![Expr::int(1)]),
        body: vec![Stmt::Pass],
        is_async: true,
    }])
    .await
    .unwrap_err();
    let EvalError::TypeError { expected, .. } = err else {
        panic!("expected a type error");
    };
    assert!(expected.contains("asynchronous iteration"));
}

#[tokio::test]
async fn plain_for_over_an_async_iterator_points_at_async_for() {
    let scope = Scope::new_module();
    scope
        .set(
            "source",
            Value::AsyncIterator(Arc::new(ValueStream::from_values("source", vec![]))),
        )
        .await;
    let program = vec![Stmt::For {
        target: Target::name("i"),
        iter: Expr::name("source"),
        body: vec![Stmt::Pass],
        is_async: false,
    }];
    let err = eval(&program, scope, None).await.unwrap_err();
    assert!(err.to_string().contains("async for"));
}

#[tokio::test]
async fn with_block_binds_the_acquired_value() {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let scope = Scope::new_module();
    scope
        .set(
            "cm",
            tracking_manager("cm", Protocol::Async, events.clone(), Value::Int(7)),
        )
        .await;

    let program = vec![Stmt::With {
        items: vec![WithItem {
            context: Expr::name("cm"),
            target: Some(Target::name("x")),
        }],
        body: vec![Stmt::assign("seen", Expr::name("x"))],
        is_async: true,
    }];
    eval(&program, scope.clone(), None).await.unwrap();

    assert_eq!(scope.get("seen").await, Some(Value::Int(7)));
    assert_eq!(
        *events.lock().unwrap(),
        vec!["acquire cm".to_string(), "release cm".to_string()]
    );
}

#[tokio::test]
async fn sync_with_block_can_still_await_in_its_body() {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let scope = Scope::new_module();
    builtins::install(&scope).await;
    scope
        .set(
            "cm",
            tracking_manager("cm", Protocol::Sync, events.clone(), Value::None),
        )
        .await;

    let program = vec![Stmt::With {
        items: vec![WithItem {
            context: Expr::name("cm"),
            target: None,
        }],
        body: vec![Stmt::assign(
            "r",
            Expr::await_(Expr::call_name("sleep", vec![Expr::int(0)])),
        )],
        is_async: false,
    }];
    eval(&program, scope.clone(), None).await.unwrap();
    assert_eq!(scope.get("r").await, Some(Value::None));
    assert_eq!(events.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn protocol_mismatch_on_with_names_the_expected_kind() {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let scope = Scope::new_module();
    scope
        .set(
            "cm",
            tracking_manager("cm", Protocol::Sync, events.clone(), Value::None),
        )
        .await;

    let program = vec![Stmt::With {
        items: vec![WithItem {
            context: Expr::name("cm"),
            target: None,
        }],
        body: vec![Stmt::Pass],
        is_async: true,
    }];
    let err = eval(&program, scope, None).await.unwrap_err();
    let EvalError::TypeError { expected, .. } = err else {
        panic!("expected a type error");
    };
    assert_eq!(expected, "an asynchronous context manager");
    assert!(events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn resources_release_in_reverse_acquisition_order() {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let scope = Scope::new_module();
    scope
        .set(
            "a",
            tracking_manager("a", Protocol::Async, events.clone(), Value::None),
        )
        .await;
    scope
        .set(
            "b",
            tracking_manager("b", Protocol::Async, events.clone(), Value::None),
        )
        .await;

    let program = vec![Stmt::With {
        items: vec![
            WithItem {
                context: Expr::name("a"),
                target: None,
            },
            WithItem {
                context: Expr::name("b"),
                target: None,
            },
        ],
        body: vec![Stmt::Pass],
        is_async: true,
    }];
    eval(&program, scope, None).await.unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec!["acquire a", "acquire b", "release b", "release a"]
    );
}

#[tokio::test]
async fn release_runs_and_observes_the_body_error() {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let scope = Scope::new_module();
    scope
        .set(
            "cm",
            tracking_manager("cm", Protocol::Async, events.clone(), Value::None),
        )
        .await;

    let program = vec![Stmt::With {
        items: vec![WithItem {
            context: Expr::name("cm"),
            target: None,
        }],
        body: vec![Stmt::Raise(Expr::str("boom"))],
        is_async: true,
    }];
    let err = eval(&program, scope, None).await.unwrap_err();

    assert!(matches!(err, EvalError::Raised { .. }));
    assert_eq!(
        *events.lock().unwrap(),
        vec!["acquire cm", "release cm (after error)"]
    );
}

#[tokio::test]
async fn failed_release_keeps_the_body_error_chained() {
    let scope = Scope::new_module();
    scope
        .set("cm", failing_release_manager("cm", Protocol::Async))
        .await;

    let program = vec![Stmt::With {
        items: vec![WithItem {
            context: Expr::name("cm"),
            target: None,
        }],
        body: vec![Stmt::Raise(Expr::str("boom"))],
        is_async: true,
    }];
    let err = eval(&program, scope, None).await.unwrap_err();

    let EvalError::ReleaseError { release, body } = err else {
        panic!("expected a release error, got {err}");
    };
    assert!(matches!(*release, EvalError::ValueError { .. }));
    assert!(matches!(body.as_deref(), Some(EvalError::Raised { .. })));
}

#[tokio::test]
async fn cancellation_before_the_first_statement() {
    let token = CancellationToken::new();
    token.cancel();

    let scope = Scope::new_module();
    let program = vec![Stmt::assign("x", Expr::int(1))];
    let err = eval(&program, scope.clone(), Some(token)).await.unwrap_err();

    assert!(matches!(err, EvalError::Cancelled));
    assert_eq!(scope.get("x").await, None);
}

#[tokio::test]
async fn cancellation_interrupts_a_pending_await_and_releases_resources() {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let scope = Scope::new_module();
    builtins::install(&scope).await;
    scope
        .set(
            "cm",
            tracking_manager("cm", Protocol::Async, events.clone(), Value::None),
        )
        .await;

    let program = vec![Stmt::With {
        items: vec![WithItem {
            context: Expr::name("cm"),
            target: None,
        }],
        body: vec![Stmt::expr(Expr::await_(Expr::call_name(
            "sleep",
            vec![Expr::int(60)],
        )))],
        is_async: true,
    }];

    let token = CancellationToken::new();
    let evaluation = eval(&program, scope.clone(), Some(token.clone()));
    let canceller = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    };
    let (result, ()) = tokio::join!(evaluation, canceller);

    assert!(matches!(result, Err(EvalError::Cancelled)));
    assert_eq!(
        *events.lock().unwrap(),
        vec!["acquire cm", "release cm (after error)"]
    );
}
