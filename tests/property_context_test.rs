//! Property tests for context pruning: the token budget holds after any
//! mutation sequence, and retained sections keep their shape.

use proptest::prelude::*;

use heike::domain::models::{estimate_tokens, CognitiveContext, Message, Plan, PlanStep};

#[derive(Debug, Clone)]
enum Op {
    History(String),
    Scratchpad(String),
    Memory(String),
    SetPlan(String),
}

fn op() -> impl Strategy<Value = Op> {
    let text = "[a-z ]{1,120}";
    prop_oneof![
        text.prop_map(Op::History),
        text.prop_map(Op::Scratchpad),
        text.prop_map(Op::Memory),
        text.prop_map(Op::SetPlan),
    ]
}

proptest! {
    /// After any sequence of updates, the estimate stays within budget.
    #[test]
    fn prop_budget_holds(budget in 1usize..200, ops in prop::collection::vec(op(), 0..40)) {
        let mut ctx = CognitiveContext::new("s", "w").with_token_budget(budget);
        for op in ops {
            match op {
                Op::History(text) => ctx.push_history(Message::user(text)),
                Op::Scratchpad(text) => ctx.push_scratchpad(text),
                Op::Memory(text) => ctx.extend_memories([text]),
                Op::SetPlan(raw) => {
                    let plan = Plan::new(raw, vec![PlanStep::new("step-1", "x")]);
                    ctx.set_plan(plan);
                }
            }
            // The always-kept plan is the one section allowed to exceed
            // the budget on its own; everything else must fit.
            let plan_tokens = ctx.plan.as_ref().map_or(0, |p| estimate_tokens(&p.raw));
            prop_assert!(
                ctx.estimated_tokens() <= budget.max(plan_tokens),
                "estimate {} exceeds budget {} (plan {})",
                ctx.estimated_tokens(),
                budget,
                plan_tokens
            );
        }
    }

    /// Kept scratchpad entries are a contiguous suffix of what was pushed.
    #[test]
    fn prop_scratchpad_is_suffix(
        budget in 10usize..100,
        entries in prop::collection::vec("[a-z]{5,40}", 1..30),
    ) {
        let mut ctx = CognitiveContext::new("s", "w").with_token_budget(budget);
        for entry in &entries {
            ctx.push_scratchpad(entry.clone());
        }
        let kept = ctx.scratchpad.len();
        prop_assert!(kept <= entries.len());
        let expected: Vec<String> = entries[entries.len() - kept..].to_vec();
        prop_assert_eq!(&ctx.scratchpad, &expected);
    }

    /// Kept history preserves relative order and favours the tail.
    #[test]
    fn prop_history_order_preserved(
        budget in 10usize..100,
        messages in prop::collection::vec("[a-z]{5,40}", 1..30),
    ) {
        let mut ctx = CognitiveContext::new("s", "w").with_token_budget(budget);
        for (i, body) in messages.iter().enumerate() {
            ctx.push_history(Message::user(format!("{i:03}:{body}")));
        }
        let kept = ctx.history.len();
        prop_assert!(kept <= messages.len());
        // The kept messages are exactly the newest ones, in order.
        let expected_start = messages.len() - kept;
        for (offset, message) in ctx.history.iter().enumerate() {
            let index: usize = message.content[..3].parse().unwrap();
            prop_assert_eq!(index, expected_start + offset);
        }
    }
}
