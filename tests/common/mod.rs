#![allow(dead_code)]

use attrparse::prelude::*;
use attrparse::GrammarError;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    // one subscriber per test binary
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn operand(ctx: &ActionContext<'_, '_>) -> i64 {
    ctx.attr_as::<(char, i64)>().map(|(_, v)| v).unwrap_or_default()
}

fn assign(ctx: &mut ActionContext<'_, '_>) {
    let value = ctx.attr_as::<i64>().unwrap_or_default();
    ctx.set_val(value);
}

fn fold(ctx: &mut ActionContext<'_, '_>, op: fn(i64, i64) -> i64) {
    let rhs = operand(ctx);
    if let Value::Int(lhs) = ctx.val_mut() {
        *lhs = op(*lhs, rhs);
    }
}

/// Integer calculator over `+ - * /` and parentheses, evaluated by actions.
pub fn calculator() -> Result<Grammar, GrammarError> {
    let mut builder = GrammarBuilder::new();
    let expr = builder.declare(RuleDecl::typed::<i64>("expr"));
    let term = builder.declare(RuleDecl::typed::<i64>("term"));
    let factor = builder.declare(RuleDecl::typed::<i64>("factor"));

    let add = (char_('+') >> &term).action(|ctx| fold(ctx, |a, b| a + b));
    let sub = (char_('-') >> &term).action(|ctx| fold(ctx, |a, b| a - b));
    builder.define(&expr, term.node().action(assign) >> (add | sub).zero_plus().omit())?;

    let mul = (char_('*') >> &factor).action(|ctx| fold(ctx, |a, b| a * b));
    let div = (char_('/') >> &factor).action(|ctx| {
        if operand(ctx) == 0 {
            ctx.report_error("division by zero");
            ctx.set_pass(false);
        } else {
            fold(ctx, |a, b| a / b);
        }
    });
    builder.define(&term, factor.node().action(assign) >> (mul | div).zero_plus().omit())?;

    let group = lit("(") >> &expr >> lit(")");
    builder.define(&factor, int_() | group)?;

    builder.build(&expr)
}
