//! End-to-end evaluation of payment formulas.

use nomina_calculator::{EvaluationError, EvaluationLimits, Evaluator, evaluate, validate_formula};
use nomina_types::{
    ArithmeticOperator, Comparison, Decimal, EvaluationContext, Formula, InstructorCategory, Node,
    Port, TariffParams, Tier,
};

fn tiers() -> TariffParams {
    TariffParams::new(
        vec![Tier::new(10, Decimal::from(5)), Tier::new(30, Decimal::from(4))],
        Decimal::new(35, 1),
    )
    .with_maximum(Decimal::from(1000))
}

fn tariff_formula(params: TariffParams) -> Formula {
    Formula::new("cycling", "Cycling")
        .with_node(Node::tariff("t", [(InstructorCategory::Instructor, params)]))
        .with_result("t")
}

fn class(reservations: u32, capacity: u32) -> EvaluationContext {
    EvaluationContext::new(reservations, capacity, InstructorCategory::Instructor)
}

#[test]
fn tier_covering_the_reservations_is_applied() {
    let result = evaluate(&tariff_formula(tiers()), &class(20, 50));

    assert!(result.is_ok(), "unexpected error: {:?}", result.error);
    assert_eq!(result.amount, Some(Decimal::from(80)));
    assert_eq!(result.applied_rate, Some(Decimal::from(4)));
    assert_eq!(result.tariff_type.as_deref(), Some("Hasta 30 reservas"));
    assert!(!result.minimum_applied);
    assert!(!result.maximum_applied);
    assert_eq!(result.bonus, None);
}

#[test]
fn full_class_pays_full_house_rate() {
    let result = evaluate(&tariff_formula(tiers()), &class(50, 50));

    assert_eq!(result.amount, Some(Decimal::from(175)));
    assert_eq!(result.applied_rate, Some(Decimal::new(35, 1)));
    assert_eq!(result.tariff_type.as_deref(), Some("Full House"));
}

#[test]
fn guaranteed_minimum_lifts_the_payment() {
    let result =
        evaluate(&tariff_formula(tiers().with_minimum(Decimal::from(200))), &class(20, 50));

    assert_eq!(result.amount, Some(Decimal::from(200)));
    assert!(result.minimum_applied);
    assert!(!result.maximum_applied);
}

#[test]
fn maximum_wins_over_a_higher_minimum() {
    let params = tiers().with_minimum(Decimal::from(200)).with_maximum(Decimal::from(150));
    let result = evaluate(&tariff_formula(params), &class(20, 50));

    assert_eq!(result.amount, Some(Decimal::from(150)));
    assert!(result.minimum_applied);
    assert!(result.maximum_applied);
}

#[test]
fn bonus_is_reported_but_not_paid() {
    let result = evaluate(&tariff_formula(tiers().with_bonus(Decimal::TWO)), &class(20, 50));

    assert_eq!(result.amount, Some(Decimal::from(80)));
    assert_eq!(result.bonus, Some(Decimal::from(40)));
}

#[test]
fn two_node_cycle_is_rejected() {
    let formula = Formula::new("loop", "Ciclo")
        .with_node(Node::arithmetic("a", ArithmeticOperator::Add))
        .with_node(Node::arithmetic("b", ArithmeticOperator::Add))
        .connect("b", "a", Port::Left)
        .connect("a", "b", Port::Left)
        .with_result("a");

    let result = evaluate(&formula, &class(1, 10));

    assert_eq!(result.amount, None);
    assert_eq!(
        result.error,
        Some(EvaluationError::CyclicGraph { nodes: vec!["a".to_string(), "b".to_string()] })
    );
    assert_eq!(validate_formula(&formula).unwrap_err().code(), "CYCLIC_GRAPH_ERROR");
}

#[test]
fn reservations_above_every_tier_fall_back_to_full_house_rate() {
    let result = evaluate(&tariff_formula(tiers()), &class(40, 50));

    assert_eq!(result.tariff_type.as_deref(), Some("Full House (por defecto)"));
    assert_eq!(result.amount, Some(Decimal::from(140)));
}

#[test]
fn missing_result_node_is_a_configuration_error() {
    let mut formula = tariff_formula(tiers());
    formula.result_node = None;

    let result = evaluate(&formula, &class(20, 50));
    assert_eq!(
        result.error,
        Some(EvaluationError::Configuration { message: "no result node defined".to_string() })
    );
}

#[test]
fn category_without_parameters_is_reported() {
    let ctx = EvaluationContext::new(20, 50, InstructorCategory::EmbajadorSenior);
    let result = evaluate(&tariff_formula(tiers()), &ctx);

    assert_eq!(result.amount, None);
    assert_eq!(
        result.error,
        Some(EvaluationError::MissingParameters {
            node: "t".to_string(),
            category: InstructorCategory::EmbajadorSenior,
        })
    );
}

#[test]
fn per_category_parameters_are_selected_by_the_context() {
    let senior = TariffParams::new(vec![Tier::new(30, Decimal::from(6))], Decimal::from(7));
    let formula = Formula::new("f", "Por categoria")
        .with_node(Node::tariff(
            "t",
            [
                (InstructorCategory::Instructor, tiers()),
                (InstructorCategory::EmbajadorSenior, senior),
            ],
        ))
        .with_result("t");

    let ctx = EvaluationContext::new(20, 50, InstructorCategory::EmbajadorSenior);
    assert_eq!(evaluate(&formula, &ctx).amount, Some(Decimal::from(120)));
    assert_eq!(evaluate(&formula, &class(20, 50)).amount, Some(Decimal::from(80)));
}

#[test]
fn division_by_a_zero_input_is_an_error() {
    let formula = Formula::new("f", "Por espera")
        .with_node(Node::input("r", "reservaciones"))
        .with_node(Node::input("w", "listaEspera"))
        .with_node(Node::arithmetic("ratio", ArithmeticOperator::Divide))
        .connect("r", "ratio", Port::Left)
        .connect("w", "ratio", Port::Right)
        .with_result("ratio");

    let result = evaluate(&formula, &class(20, 50));
    assert_eq!(result.amount, None);
    assert_eq!(result.error, Some(EvaluationError::DivisionByZero { node: "ratio".to_string() }));
}

#[test]
fn unknown_context_field_is_an_error() {
    let formula = Formula::new("f", "Campo raro")
        .with_node(Node::input("x", "asistentes"))
        .with_result("x");

    let result = evaluate(&formula, &class(20, 50));
    assert_eq!(
        result.error,
        Some(EvaluationError::UnknownField {
            node: "x".to_string(),
            field: "asistentes".to_string(),
        })
    );
}

#[test]
fn unconnected_operand_is_reported() {
    let formula = Formula::new("f", "Incompleta")
        .with_node(Node::constant("k", Decimal::ONE))
        .with_node(Node::arithmetic("s", ArithmeticOperator::Add))
        .connect("k", "s", Port::Left)
        .with_result("s");

    let result = evaluate(&formula, &class(1, 1));
    assert_eq!(
        result.error,
        Some(EvaluationError::MissingInput { node: "s".to_string(), port: Port::Right })
    );
}

#[test]
fn tariff_output_feeds_downstream_arithmetic() {
    // Tariff payment plus a fixed per-class allowance, paid only for classes with a waitlist.
    let formula = Formula::new("f", "Con viaticos")
        .with_node(Node::tariff("t", [(InstructorCategory::Instructor, tiers())]))
        .with_node(Node::input("espera", "listaEspera"))
        .with_node(Node::constant("cero", Decimal::ZERO))
        .with_node(Node::constant("viatico", Decimal::from(25)))
        .with_node(Node::conditional("extra", Comparison::Greater))
        .with_node(Node::arithmetic("total", ArithmeticOperator::Add))
        .connect("espera", "extra", Port::Left)
        .connect("cero", "extra", Port::Right)
        .connect("viatico", "extra", Port::WhenTrue)
        .connect("cero", "extra", Port::WhenFalse)
        .connect("t", "total", Port::Left)
        .connect("extra", "total", Port::Right)
        .with_result("total");

    let mut ctx = class(50, 50);
    ctx.waitlist = 4;
    let result = evaluate(&formula, &ctx);
    assert_eq!(result.amount, Some(Decimal::from(200)));
    assert_eq!(result.tariff_type.as_deref(), Some("Full House"));

    ctx.waitlist = 0;
    assert_eq!(evaluate(&formula, &ctx).amount, Some(Decimal::from(175)));
}

#[test]
fn tariff_can_read_reservations_from_another_node() {
    // Only paid reservations count towards the tariff.
    let formula = Formula::new("f", "Pagadas")
        .with_node(Node::input("pagadas", "reservasPagadas"))
        .with_node(Node::tariff("t", [(InstructorCategory::Instructor, tiers())]))
        .connect("pagadas", "t", Port::Reservations)
        .with_result("t");

    let mut ctx = class(20, 50);
    ctx.paid_reservations = 8;
    let result = evaluate(&formula, &ctx);
    assert_eq!(result.amount, Some(Decimal::from(40)));
    assert_eq!(result.tariff_type.as_deref(), Some("Hasta 10 reservas"));
}

#[test]
fn trace_ends_with_the_payment() {
    let result = evaluate(&tariff_formula(tiers().with_bonus(Decimal::TWO)), &class(20, 50));

    assert_eq!(
        result.steps.first().map(String::as_str),
        Some("Tarifa 't' para categoría INSTRUCTOR")
    );
    assert!(result.steps.iter().any(|s| s == "Monto base: 4 x 20 = 80"));
    assert_eq!(result.steps.last().map(String::as_str), Some("Monto a pagar: 80"));
}

#[test]
fn long_chains_evaluate_without_recursion() {
    // one + one + ... with 5000 additions, each node feeding the next.
    let mut formula =
        Formula::new("chain", "Cadena").with_node(Node::constant("uno", Decimal::ONE));
    let mut previous = "uno".to_string();
    for i in 0..5_000 {
        let id = format!("s{i}");
        formula = formula
            .with_node(Node::arithmetic(id.as_str(), ArithmeticOperator::Add))
            .connect(previous.as_str(), id.as_str(), Port::Left)
            .connect("uno", id.as_str(), Port::Right);
        previous = id;
    }
    let formula = formula.with_result(previous.as_str());

    let evaluator = Evaluator::new(EvaluationLimits { max_nodes: 10_000, max_steps: 1_000_000 });
    let result = evaluator.evaluate(&formula, &class(1, 1));
    assert_eq!(result.amount, Some(Decimal::from(5_001)));

    let small = evaluate(&formula, &class(1, 1));
    assert_eq!(small.error.map(|e| e.code()), Some("BUDGET_EXCEEDED_ERROR"));
}

#[test]
fn evaluating_twice_gives_identical_results() {
    let formula = tariff_formula(tiers().with_minimum(Decimal::from(90)).with_bonus(Decimal::ONE));
    let ctx = class(12, 40);
    assert_eq!(evaluate(&formula, &ctx), evaluate(&formula, &ctx));
}

#[test]
fn formula_loaded_from_json_evaluates() {
    let formula: Formula = serde_json::from_str(
        r#"{
            "id": 12,
            "nombre": "Barre",
            "nodos": [
                {"id": "t", "tipo": "tarifa", "parametros": {"EMBAJADOR": {
                    "tarifas": [{"numeroReservas": 30, "tarifa": "4"}, {"numeroReservas": 10, "tarifa": "5"}],
                    "tarifaFullHouse": "3.5", "cuotaFija": "10", "minimoGarantizado": "0",
                    "maximo": "1000", "bono": "0"
                }}}
            ],
            "conexiones": [],
            "nodoResultado": "t"
        }"#,
    )
    .unwrap();

    let ctx = EvaluationContext::new(8, 20, InstructorCategory::Embajador);
    let result = evaluate(&formula, &ctx);
    assert_eq!(result.amount, Some(Decimal::from(50)));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["tipoTarifa"], "Hasta 10 reservas");
    assert_eq!(json["minimoAplicado"], false);
    assert!(json["detalleCalculo"].as_array().is_some_and(|steps| !steps.is_empty()));
    assert!(json["error"].is_null());
}

#[test]
fn failure_serializes_its_code() {
    let mut formula = tariff_formula(tiers());
    formula.result_node = Some("nada".into());

    let json = serde_json::to_value(evaluate(&formula, &class(1, 2))).unwrap();
    assert!(json["montoPago"].is_null());
    assert_eq!(json["error"]["codigo"], "CONFIGURATION_ERROR");
}
