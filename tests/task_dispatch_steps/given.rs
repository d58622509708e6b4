//! Given steps for task dispatch BDD scenarios.

use super::world::{DispatchWorld, SCENARIO_REQUESTER, account, run_async};
use captcha_dispatch::task::services::CreateTaskRequest;
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given(r#"a pending task for site key "{site_key}""#)]
fn pending_task(world: &mut DispatchWorld, site_key: String) -> Result<(), eyre::Report> {
    let request =
        CreateTaskRequest::new(account(SCENARIO_REQUESTER)?, site_key, "https://example.com");
    run_async(world.coordinator.create_task(request)).wrap_err("create task for scenario")?;
    Ok(())
}
