mod common;

use common::*;
use cppforge::ast::{
    AssignStmt, Attribute, Decl, EnumDecl, EnumItem, Expr, Field, FnDecl, Generic, ImplDecl,
    PackageId, Receiver, RetType, Stmt, StructDecl, TraitDecl, VarDecl,
};
use cppforge::codegen::mangle;
use cppforge::types::{TypeCode, TypeDescriptor};
use cppforge::MessageKey;

fn main_id(name: &str) -> String {
    mangle::out_id(name, &PackageId::new("main"))
}

fn global(name: &str, ty: Option<TypeDescriptor>, init: &str) -> Decl {
    Decl::Var(var(name, ty, init, &pos("main")))
}

fn body_fn(name: &str, ret: RetType, body: Vec<Stmt>) -> Decl {
    Decl::Fn(func(name, &pos("main"), Vec::new(), ret, body))
}

fn local(name: &str, init: &str) -> Stmt {
    Stmt::Var(var(name, None, init, &pos("main")))
}

fn assign(target: &str, op: &str, value: &str) -> Stmt {
    let at = pos("main");
    Stmt::Assign(AssignStmt {
        pos: at.clone(),
        target: expr(target, &at),
        op: op.to_string(),
        value: expr(value, &at),
    })
}

fn point_struct() -> Decl {
    let at = pos("main");
    let field = |name: &str| Field {
        name: name.to_string(),
        public: true,
        ty: ty(TypeCode::Int),
        pos: at.clone(),
    };
    Decl::Struct(StructDecl {
        name: "Point".to_string(),
        public: true,
        pos: at.clone(),
        generics: Vec::new(),
        fields: vec![field("x"), field("y")],
        attributes: Vec::new(),
    })
}

fn point_ty() -> TypeDescriptor {
    TypeDescriptor::named(TypeCode::Struct, "Point")
}

fn method(name: &str, body: Vec<Stmt>) -> FnDecl {
    let mut decl = func(name, &pos("main"), Vec::new(), RetType::new(ty(TypeCode::Int)), body);
    decl.receiver = Some(Receiver {
        ty: point_ty(),
        mutable: false,
    });
    decl
}

fn shape_trait() -> Decl {
    let mut area = FnDecl::new("area", pos("main"));
    area.ret = RetType::new(ty(TypeCode::Int));
    Decl::Trait(TraitDecl {
        name: "Shape".to_string(),
        public: true,
        pos: pos("main"),
        methods: vec![area],
    })
}

#[test]
fn constant_range_of_u8_globals() {
    let u8_t = || Some(ty(TypeCode::U8));
    let keys = error_keys(compile(&package("main", &[], vec![global("a", u8_t(), "300")])));
    assert_eq!(keys, vec![MessageKey::OverflowLimits]);

    let keys = error_keys(compile(&package("main", &[], vec![global("a", u8_t(), "-1")])));
    assert_eq!(keys, vec![MessageKey::OverflowLimits]);

    let out = output(compile(&package("main", &[], vec![global("a", u8_t(), "255")])));
    assert!(out.contains(&format!("u8_t {}{{255}};", main_id("a"))), "{out}");
}

#[test]
fn folding_reports_division_by_zero() {
    let keys = error_keys(compile(&package("main", &[], vec![global("a", None, "1 / 0")])));
    assert_eq!(keys, vec![MessageKey::DivideByZero]);

    let out = output(compile(&package("main", &[], vec![global("a", None, "(2 + 3) * 4")])));
    assert!(out.contains(&format!("i64_t {}{{20}};", main_id("a"))), "{out}");
}

#[test]
fn local_definitions_shadow_dependencies() {
    let lib_at = pos("lib");
    let lib = package(
        "lib",
        &[],
        vec![
            Decl::Var(var("value", None, "1", &lib_at)),
            Decl::Fn(func(
                "helper",
                &lib_at,
                Vec::new(),
                RetType::new(ty(TypeCode::Int)),
                vec![ret("value", &lib_at)],
            )),
        ],
    );
    let main = package(
        "main",
        &["lib"],
        vec![
            global("value", None, "2"),
            global("v", None, "value"),
            global("h", None, "helper()"),
        ],
    );
    let mut driver = driver();
    driver.add_dependency(lib);
    let out = output(driver.compile(&main));

    let lib_id = PackageId::new("lib");
    assert!(out.contains(&format!("i64_t {}{{{}}};", main_id("v"), main_id("value"))), "{out}");
    assert!(out.contains(&format!("{}()", mangle::out_id("helper", &lib_id))), "{out}");
    assert!(out.contains(&format!("i64_t {}{{1}};", mangle::out_id("value", &lib_id))), "{out}");
}

#[test]
fn unknown_use_is_reported() {
    let keys = error_keys(compile(&package("main", &["nowhere"], Vec::new())));
    assert_eq!(keys, vec![MessageKey::IdNoexist]);
}

#[test]
fn tuple_returns() {
    let pair = || RetType::new(TypeDescriptor::tuple(vec![ty(TypeCode::Int), ty(TypeCode::Bool)]));
    let at = pos("main");

    let out = output(compile(&package(
        "main",
        &[],
        vec![body_fn("pair", pair(), vec![ret("1, true", &at)])],
    )));
    assert!(out.contains("return std::make_tuple(1,true);"), "{out}");
    assert!(out.contains("std::tuple<i64_t,bool> pair_"), "{out}");

    let keys = error_keys(compile(&package(
        "main",
        &[],
        vec![body_fn("pair", pair(), vec![ret("1", &at)])],
    )));
    assert_eq!(keys, vec![MessageKey::MissingMultiReturn]);

    let keys = error_keys(compile(&package(
        "main",
        &[],
        vec![body_fn("pair", pair(), vec![ret("1, true, 2", &at)])],
    )));
    assert_eq!(keys, vec![MessageKey::OverflowReturn]);
}

#[test]
fn return_shape_errors() {
    let at = pos("main");
    let keys = error_keys(compile(&package(
        "main",
        &[],
        vec![body_fn("f", RetType::void(), vec![ret("1", &at)])],
    )));
    assert_eq!(keys, vec![MessageKey::VoidFunctionReturnValue]);

    let keys = error_keys(compile(&package(
        "main",
        &[],
        vec![body_fn("f", RetType::new(ty(TypeCode::Int)), vec![ret("", &at)])],
    )));
    assert_eq!(keys, vec![MessageKey::RequireReturnValue]);
}

#[test]
fn named_results_allow_bare_return() {
    let at = pos("main");
    let named = RetType::named(
        TypeDescriptor::tuple(vec![ty(TypeCode::Int), ty(TypeCode::Bool)]),
        vec!["n".to_string(), "ok".to_string()],
    );
    let out = output(compile(&package(
        "main",
        &[],
        vec![body_fn("f", named, vec![assign("n", "=", "3"), ret("", &at)])],
    )));
    assert!(out.contains("i64_t n_ = 0;"), "{out}");
    assert!(out.contains("n_ = 3;"), "{out}");
    assert!(out.contains("return std::make_tuple(n_,ok_);"), "{out}");
}

#[test]
fn struct_equality_and_methods() {
    let at = pos("main");
    let eq = func(
        "eq",
        &at,
        vec![param("a", point_ty(), &at), param("b", point_ty(), &at)],
        RetType::new(ty(TypeCode::Bool)),
        vec![ret("a == b", &at)],
    );
    let sum = method("sum", vec![ret("self.x + self.y", &at)]);
    let decls = vec![
        point_struct(),
        Decl::Impl(ImplDecl {
            target: "Point".to_string(),
            trait_name: None,
            pos: at.clone(),
            methods: vec![sum],
        }),
        Decl::Fn(eq),
        body_fn(
            "origin",
            RetType::new(ty(TypeCode::Int)),
            vec![local("p", "Point{1, 2}"), ret("p.sum()", &at)],
        ),
    ];
    let out = output(compile(&package("main", &[], decls)));
    assert!(out.contains("return (a_ == b_);"), "{out}");
    assert!(out.contains("return ((*this).x_ + (*this).y_);"), "{out}");
    assert!(out.contains(&format!("{point} p_ = {point}(1,2);", point = main_id("Point"))), "{out}");
    assert!(out.contains("return p_.sum_();"), "{out}");
}

#[test]
fn struct_literals_need_every_field() {
    let decls = vec![point_struct(), body_fn("f", RetType::void(), vec![local("p", "Point{1}")])];
    let keys = error_keys(compile(&package("main", &[], decls)));
    assert_eq!(keys, vec![MessageKey::MissingArgument]);

    let decls = vec![
        point_struct(),
        body_fn("f", RetType::void(), vec![local("p", "Point{1, 2}"), local("q", "p.z")]),
    ];
    let keys = error_keys(compile(&package("main", &[], decls)));
    assert_eq!(keys, vec![MessageKey::ObjHaveNotId]);
}

#[test]
fn traits_accept_implementing_structs() {
    let at = pos("main");
    let area = method("area", vec![ret("self.x * self.y", &at)]);
    let decls = vec![
        shape_trait(),
        point_struct(),
        Decl::Impl(ImplDecl {
            target: "Point".to_string(),
            trait_name: Some("Shape".to_string()),
            pos: at.clone(),
            methods: vec![area],
        }),
        body_fn(
            "f",
            RetType::new(ty(TypeCode::Int)),
            vec![
                Stmt::Var(var(
                    "s",
                    Some(TypeDescriptor::named(TypeCode::Trait, "Shape")),
                    "Point{2, 3}",
                    &at,
                )),
                ret("s.area()", &at),
            ],
        ),
    ];
    let out = output(compile(&package("main", &[], decls)));
    assert!(out.contains(&format!("trait_t<{}> s_", main_id("Shape"))), "{out}");
    assert!(out.contains("return s_->area_();"), "{out}");
}

#[test]
fn missing_trait_method_is_reported() {
    let at = pos("main");
    let decls = vec![
        shape_trait(),
        point_struct(),
        Decl::Impl(ImplDecl {
            target: "Point".to_string(),
            trait_name: Some("Shape".to_string()),
            pos: at,
            methods: Vec::new(),
        }),
    ];
    let keys = error_keys(compile(&package("main", &[], decls)));
    assert_eq!(keys, vec![MessageKey::TraitNotImplemented]);
}

#[test]
fn output_is_deterministic() {
    let build = || {
        package(
            "main",
            &[],
            vec![
                point_struct(),
                global("a", None, "1 + 2"),
                body_fn("f", RetType::new(ty(TypeCode::Int)), vec![ret("a", &pos("main"))]),
            ],
        )
    };
    let first = output(compile(&build()));
    let second = output(compile(&build()));
    assert_eq!(first, second);
}

#[test]
fn generic_functions_need_explicit_arguments() {
    let at = pos("main");
    let t = TypeDescriptor::named(TypeCode::Struct, "T");
    let mut id = func("id", &at, vec![param("v", t.clone(), &at)], RetType::new(t), vec![ret("v", &at)]);
    id.generics = vec![Generic {
        name: "T".to_string(),
        pos: at.clone(),
    }];

    let decls = vec![
        Decl::Fn(id.clone()),
        body_fn("f", RetType::void(), vec![local("x", "id[int](5)")]),
    ];
    let out = output(compile(&package("main", &[], decls)));
    assert!(out.contains("template<typename T0>"), "{out}");
    assert!(out.contains(&format!("i64_t x_ = {}<i64_t>(5);", main_id("id"))), "{out}");

    let decls = vec![Decl::Fn(id), body_fn("f", RetType::void(), vec![local("x", "id(5)")])];
    let keys = error_keys(compile(&package("main", &[], decls)));
    assert_eq!(keys, vec![MessageKey::GenericArgumentCount]);
}

#[test]
fn extern_functions_keep_their_name() {
    let at = pos("main");
    let mut puts = FnDecl::new("puts", at.clone());
    puts.public = true;
    puts.params = vec![param("s", ty(TypeCode::Str), &at)];
    puts.attributes = vec![Attribute::Extern];
    let decls = vec![
        Decl::Fn(puts),
        body_fn("f", RetType::void(), vec![Stmt::Expr(expr("puts(\"hi\")", &at))]),
    ];
    let out = output(compile(&package("main", &[], decls)));
    assert!(out.contains("puts(str_t{{0x68,0x69}});"), "{out}");
    assert!(!out.contains("puts_"), "{out}");
}

#[test]
fn declaration_errors() {
    let keys = error_keys(compile(&package(
        "main",
        &[],
        vec![body_fn("f", RetType::void(), vec![local("x", "1"), local("x", "2")])],
    )));
    assert_eq!(keys, vec![MessageKey::ExistId]);

    let keys = error_keys(compile(&package(
        "main",
        &[],
        vec![body_fn("f", RetType::void(), vec![local("x", "nil")])],
    )));
    assert_eq!(keys, vec![MessageKey::NilForAutotype]);

    let keys = error_keys(compile(&package("main", &[], vec![global("a", None, "")])));
    assert_eq!(keys, vec![MessageKey::MissingAutotypeValue]);
}

#[test]
fn closures_lower_to_lambdas() {
    let at = pos("main");
    let mut inc = FnDecl::new("", at.clone());
    inc.params = vec![param("a", ty(TypeCode::Int), &at)];
    inc.ret = RetType::new(ty(TypeCode::Int));
    inc.body = Some(vec![ret("a + 1", &at)]);
    let f = Stmt::Var(VarDecl {
        init: Some(Expr::new(lex("$0", &at)).with_closures(vec![inc])),
        ..var("f", None, "", &at)
    });
    let out = output(compile(&package(
        "main",
        &[],
        vec![body_fn("g", RetType::new(ty(TypeCode::Int)), vec![f, ret("f(2)", &at)])],
    )));
    assert!(
        out.contains("std::function<i64_t(i64_t)>([=](i64_t a_) mutable -> i64_t {"),
        "{out}"
    );
    assert!(out.contains("return (a_ + 1);"), "{out}");
    assert!(out.contains("return f_(2);"), "{out}");
}

#[test]
fn assignment_errors() {
    let at = pos("main");
    let const_local = Stmt::Var(constant("c", None, "1", &at));
    let keys = error_keys(compile(&package(
        "main",
        &[],
        vec![body_fn("f", RetType::void(), vec![const_local, assign("c", "=", "2")])],
    )));
    assert_eq!(keys, vec![MessageKey::AssignConst]);

    let p = func("g", &at, vec![param("p", ty(TypeCode::Int), &at)], RetType::void(), vec![assign("p", "+=", "1")]);
    let keys = error_keys(compile(&package("main", &[], vec![Decl::Fn(p)])));
    assert_eq!(keys, vec![MessageKey::AssignNonLvalue]);

    let keys = error_keys(compile(&package(
        "main",
        &[],
        vec![body_fn("f", RetType::void(), vec![local("x", "1"), assign("x", "=", "true")])],
    )));
    assert_eq!(keys, vec![MessageKey::IncompatibleTypes]);
}

#[test]
fn enum_items_count_up() {
    let at = pos("main");
    let item = |name: &str, value: Option<&str>| EnumItem {
        name: name.to_string(),
        pos: at.clone(),
        expr: value.map(|v| expr(v, &at)),
    };
    let color = Decl::Enum(EnumDecl {
        name: "Color".to_string(),
        public: true,
        pos: at.clone(),
        ty: ty(TypeCode::U8),
        items: vec![item("Red", None), item("Green", Some("5")), item("Blue", None)],
    });
    let use_color = Stmt::Var(var(
        "c",
        Some(TypeDescriptor::named(TypeCode::Enum, "Color")),
        "Color.Blue",
        &at,
    ));
    let out = output(compile(&package(
        "main",
        &[],
        vec![color, body_fn("f", RetType::void(), vec![use_color])],
    )));
    assert!(out.contains("Green_ = 5,"), "{out}");
    assert!(out.contains("Blue_ = 6,"), "{out}");
    assert!(out.contains(&format!("{color} c_ = {color}::Blue_;", color = main_id("Color"))), "{out}");
}

#[test]
fn namespace_members_are_qualified() {
    use cppforge::ast::NamespaceDecl;

    let at = pos("main");
    let geo = Decl::Namespace(NamespaceDecl {
        name: "geo".to_string(),
        pos: at.clone(),
        decls: vec![Decl::Var(var("origin", None, "7", &at))],
    });
    let out = output(compile(&package(
        "main",
        &[],
        vec![geo, global("x", None, "geo::origin")],
    )));
    let origin = mangle::out_id("origin", &PackageId::new("main::geo"));
    assert!(out.contains(&format!("i64_t {origin}{{7}};")), "{out}");
    assert!(out.contains(&format!("i64_t {}{{{origin}}};", main_id("x"))), "{out}");
}

fn returned_model(package: &cppforge::ast::Package, decl: usize) -> Option<String> {
    let Decl::Fn(f) = &package.files[0].decls[decl] else {
        panic!("declaration {decl} is not a function");
    };
    let body = f.body.as_ref().expect("function body");
    body.iter().find_map(|stmt| match stmt {
        Stmt::Return(r) => r.expr.model().map(|m| m.to_string()),
        _ => None,
    })
}

#[test]
fn extra_values_for_a_single_result_still_lower_the_first() {
    let at = pos("main");
    let int = || RetType::new(ty(TypeCode::Int));

    let main = package("main", &[], vec![body_fn("f", int(), vec![ret("1, 2", &at)])]);
    let keys = error_keys(compile(&main));
    assert_eq!(keys, vec![MessageKey::OverflowReturn]);
    assert_eq!(returned_model(&main, 0).as_deref(), Some("return 1"));

    let main = package("main", &[], vec![body_fn("f", int(), vec![ret("\"a\", 2", &at)])]);
    let keys = error_keys(compile(&main));
    assert_eq!(keys, vec![MessageKey::OverflowReturn, MessageKey::IncompatibleTypes]);
}

#[test]
fn short_tuple_returns_check_present_positions() {
    let at = pos("main");
    let triple = || {
        RetType::new(TypeDescriptor::tuple(vec![
            ty(TypeCode::Int),
            ty(TypeCode::Bool),
            ty(TypeCode::Int),
        ]))
    };

    let main = package("main", &[], vec![body_fn("f", triple(), vec![ret("1, true", &at)])]);
    let out = output(compile(&main));
    assert!(out.contains("return std::make_tuple(1,true);"), "{out}");

    let main = package("main", &[], vec![body_fn("f", triple(), vec![ret("1, 2", &at)])]);
    let keys = error_keys(compile(&main));
    assert_eq!(keys, vec![MessageKey::IncompatibleTypes]);
    assert_eq!(returned_model(&main, 0).as_deref(), Some("return std::make_tuple(1,2)"));
}

#[test]
fn tuple_values_returned_whole() {
    let at = pos("main");
    let pair = || RetType::new(TypeDescriptor::tuple(vec![ty(TypeCode::Int), ty(TypeCode::Bool)]));
    let triple = || {
        RetType::new(TypeDescriptor::tuple(vec![
            ty(TypeCode::Int),
            ty(TypeCode::Bool),
            ty(TypeCode::Int),
        ]))
    };

    let out = output(compile(&package(
        "main",
        &[],
        vec![
            body_fn("pair", pair(), vec![ret("1, true", &at)]),
            body_fn("again", pair(), vec![ret("pair()", &at)]),
        ],
    )));
    assert!(out.contains(&format!("return {}();", main_id("pair"))), "{out}");

    let keys = error_keys(compile(&package(
        "main",
        &[],
        vec![
            body_fn("triple", triple(), vec![ret("1, true, 2", &at)]),
            body_fn("f", pair(), vec![ret("triple()", &at)]),
        ],
    )));
    assert_eq!(keys, vec![MessageKey::OverflowReturn]);

    let keys = error_keys(compile(&package(
        "main",
        &[],
        vec![
            body_fn("one", RetType::new(ty(TypeCode::Int)), vec![ret("1", &at)]),
            body_fn("f", pair(), vec![ret("one()", &at)]),
        ],
    )));
    assert_eq!(keys, vec![MessageKey::MissingMultiReturn]);
}

#[test]
fn bare_return_fills_ignored_names_with_defaults() {
    let at = pos("main");
    let named = RetType::named(
        TypeDescriptor::tuple(vec![ty(TypeCode::Int), ty(TypeCode::Bool)]),
        vec!["n".to_string(), "_".to_string()],
    );
    let out = output(compile(&package(
        "main",
        &[],
        vec![body_fn("f", named, vec![assign("n", "=", "3"), ret("", &at)])],
    )));
    assert!(out.contains("return std::make_tuple(n_,false);"), "{out}");
}

#[test]
fn string_literals_lower_to_bytes() {
    let out = output(compile(&package(
        "main",
        &[],
        vec![
            global("raw", None, "`a\\b`"),
            global("utf", None, "\"h\u{e9}\""),
            global("joined", None, "\"a\" + `b`"),
        ],
    )));
    let lowered = |name: &str, bytes: &str| {
        out.contains(&format!("str_t {}{{str_t{{{{{bytes}}}}}}};", main_id(name)))
    };
    assert!(lowered("raw", "0x61,0x5c,0x62"), "{out}");
    assert!(lowered("utf", "0x68,0xc3,0xa9"), "{out}");
    assert!(lowered("joined", "0x61,0x62"), "{out}");

    let keys = error_keys(compile(&package("main", &[], vec![global("bad", None, "\"\\q\"")])));
    assert_eq!(keys, vec![MessageKey::InvalidSyntax]);
}

#[test]
fn receiver_name_cannot_be_reused_by_a_parameter() {
    let at = pos("main");
    let mut sum = method("sum", vec![ret("1", &at)]);
    sum.params = vec![param("self", ty(TypeCode::Int), &at)];
    let decls = vec![
        point_struct(),
        Decl::Impl(ImplDecl {
            target: "Point".to_string(),
            trait_name: None,
            pos: at.clone(),
            methods: vec![sum],
        }),
    ];
    let keys = error_keys(compile(&package("main", &[], decls)));
    assert_eq!(keys, vec![MessageKey::ExistId]);
}
