//! Pure-function prompt construction: turns a setup candidate and account
//! snapshot into [`PromptInputs`] without touching any external service.

use fiona_markets::account::AccountState;
use fiona_markets::Side;
use fiona_strategies::SetupCandidate;

use crate::types::PromptInputs;

pub fn build_prompt_inputs(setup: &SetupCandidate, account: &AccountState) -> PromptInputs {
    let (range_high, range_low) = setup
        .breakout_context
        .as_ref()
        .map(|ctx| (Some(ctx.range_high), Some(ctx.range_low)))
        .unwrap_or((None, None));

    PromptInputs {
        epic: setup.epic.to_string(),
        setup_kind: format!("{:?}", setup.setup_kind),
        phase: setup.phase.to_string(),
        reference_price: setup.reference_price,
        direction_hint: match setup.direction {
            Side::Long => "LONG".to_string(),
            Side::Short => "SHORT".to_string(),
        },
        range_high,
        range_low,
        account_equity: account.equity,
    }
}
