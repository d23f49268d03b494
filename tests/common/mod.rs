//! Shared mock catalog and checking helpers for integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use requisition::{
    Command, CommandCatalog, Completer, FlagPolicy, ParamType, Parameter, Reply, Session, Status,
    Value,
};

/// Completers parked by `tsdefer`, finished by the test
pub type Parked = Arc<Mutex<Vec<Completer>>>;

fn text_of(args: &requisition::Args) -> Value {
    let parts: Vec<String> = args
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    Value::from(parts.join(" "))
}

/// The mock commands used throughout the integration tests
pub fn mock_catalog(parked: Parked) -> Arc<CommandCatalog> {
    let mut catalog = CommandCatalog::new();

    catalog
        .register(
            Command::new("tsv")
                .param(Parameter::selection("optionType", ["option1", "option2", "option3"]))
                .param(Parameter::string("optionValue"))
                .exec(|args, _| Ok(Reply::Value(text_of(args)))),
        )
        .unwrap();

    catalog
        .register(
            Command::new("tsr")
                .param(Parameter::string("text").rest())
                .exec(|args, _| Ok(Reply::value(args.get_str("text").unwrap_or_default()))),
        )
        .unwrap();

    catalog
        .register(
            Command::new("tso")
                .param(Parameter::string("text").optional())
                .exec(|args, _| Ok(Reply::Value(text_of(args)))),
        )
        .unwrap();

    catalog
        .register(
            Command::new("tsb")
                .param(Parameter::boolean("toggle").short('t'))
                .exec(|args, _| Ok(Reply::value(args.get_bool("toggle")))),
        )
        .unwrap();

    catalog
        .register(Command::new("tss").exec(|_, _| Ok(Reply::value("tss"))))
        .unwrap();

    catalog
        .register(
            Command::new("tsu")
                .param(Parameter::new(
                    "num",
                    ParamType::Number {
                        min: Some(-5.0),
                        max: Some(10.0),
                        allow_float: false,
                    },
                ))
                .exec(|args, _| Ok(Reply::Value(text_of(args)))),
        )
        .unwrap();

    catalog.register(Command::new("tsn").description("group")).unwrap();
    for sub in ["tsn dif", "tsn ext", "tsn exte", "tsn exten", "tsn extend"] {
        catalog
            .register(
                Command::new(sub)
                    .param(Parameter::string("text"))
                    .exec(|args, ctx| {
                        let text = args.get_str("text").unwrap_or_default();
                        Ok(Reply::value(format!("{} {}", ctx.command_name(), text)))
                    }),
            )
            .unwrap();
    }

    catalog
        .register(
            Command::new("tsm")
                .hidden()
                .param(Parameter::selection("abc", ["aaa", "bbb", "ccc"]))
                .param(Parameter::string("txt"))
                .param(Parameter::new(
                    "num",
                    ParamType::Number {
                        min: Some(0.0),
                        max: Some(42.0),
                        allow_float: true,
                    },
                ))
                .exec(|args, _| Ok(Reply::Value(text_of(args)))),
        )
        .unwrap();

    catalog
        .register(
            Command::new("tslong")
                .param(Parameter::string("msg"))
                .param(Parameter::number("num").short('n').default_value(2).named_only())
                .param(
                    Parameter::selection("sel", ["space", "tab"])
                        .short('s')
                        .optional()
                        .named_only(),
                )
                .param(Parameter::boolean("bool").short('b'))
                .param(Parameter::boolean("bool2"))
                .param(
                    Parameter::selection("sel2", ["collapse", "basic", "with space", "with two spaces"])
                        .default_value("collapse")
                        .named_only(),
                )
                .param(Parameter::number("num2").default_value(42).named_only())
                .exec(|args, _| Ok(Reply::Value(Value::from(args.clone())))),
        )
        .unwrap();

    catalog
        .register(
            Command::new("tsbd")
                .param(Parameter::boolean("on").default_value(true))
                .param(Parameter::boolean("off").short('o'))
                .exec(|args, _| Ok(Reply::Value(Value::from(args.clone())))),
        )
        .unwrap();

    catalog
        .register(
            Command::new("tspos")
                .flag_policy(FlagPolicy::PositionalFirst)
                .param(Parameter::string("first"))
                .param(Parameter::string("second").optional())
                .exec(|args, _| Ok(Reply::Value(text_of(args)))),
        )
        .unwrap();

    catalog
        .register(
            Command::new("tsdefer")
                .param(Parameter::string("msg").optional())
                .exec(move |_, ctx| {
                    let completer = ctx.defer();
                    parked.lock().unwrap().push(completer);
                    Ok(Reply::Deferred)
                }),
        )
        .unwrap();

    catalog
        .register(
            Command::new("tsfail")
                .param(Parameter::string("reason").optional().rest())
                .exec(|args, _| {
                    let reason = args.get_str("reason").unwrap_or("no reason");
                    anyhow::bail!("tsfail: {}", reason)
                }),
        )
        .unwrap();

    catalog
        .register(
            Command::new("tsbogus").exec(|_, _| Ok(Reply::Deferred)),
        )
        .unwrap();

    catalog
        .register(
            Command::new("help")
                .param(Parameter::command("search").optional())
                .exec(|args, _| Ok(Reply::Value(text_of(args)))),
        )
        .unwrap();

    catalog
        .register(
            Command::new("exec")
                .param(Parameter::requisition("line"))
                .exec(|args, _| Ok(Reply::Value(args.get("line").cloned().unwrap_or(Value::Null)))),
        )
        .unwrap();

    Arc::new(catalog)
}

pub fn session() -> Session {
    Session::new(mock_catalog(Parked::default()))
}

pub fn session_with_parked() -> (Session, Parked) {
    let parked = Parked::default();
    (Session::new(mock_catalog(Arc::clone(&parked))), parked)
}

/// Expected state of one assignment
pub struct Arg<'a> {
    pub name: &'a str,
    pub value: Option<Value>,
    pub arg: &'a str,
    pub status: Status,
    pub message: &'a str,
}

/// Check the named assignments of the session's current line
pub fn check_args(session: &Session, expected: &[Arg<'_>]) {
    let snapshot = session.snapshot();
    for want in expected {
        let got = snapshot
            .assignments
            .iter()
            .find(|a| a.name == want.name)
            .unwrap_or_else(|| panic!("no assignment '{}' for {:?}", want.name, snapshot.input));
        assert_eq!(got.value, want.value, "value of {} for {:?}", want.name, snapshot.input);
        assert_eq!(got.arg, want.arg, "arg of {} for {:?}", want.name, snapshot.input);
        assert_eq!(got.status, want.status, "status of {} for {:?}", want.name, snapshot.input);
        assert_eq!(got.message, want.message, "message of {} for {:?}", want.name, snapshot.input);
    }
}
