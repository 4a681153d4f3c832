//! Connector GPIO output pin.

use serde_json::Value;

use ecmcli_api::models::RemoteResult;

use crate::cli::{GlobalOpts, GpioArgs};
use crate::error::CliError;
use crate::session::Context;

use super::util;

fn human_status(value: i64) -> &'static str {
    if value == 0 { "OFF (0)" } else { "ON (1)" }
}

fn failure_message(result: &RemoteResult) -> String {
    format!("API call failed: {}", result.failure())
}

pub async fn handle(ctx: &Context, args: GpioArgs, _global: &GlobalOpts) -> Result<(), CliError> {
    let router = ctx.client.get_router(&args.router).await?;
    let label = util::label(&router.name, &router.id);

    if let Some(value) = args.value {
        println!("Setting GPIO on {label} to: {}", human_status(value));
        let result = ctx.client.set_gpio_output(&router.id, value).await?;
        if !result.success {
            return Err(CliError::Remote {
                message: failure_message(&result),
            });
        }
    }

    let result = ctx.client.gpio_output(&router.id).await?;
    if !result.success {
        return Err(CliError::Remote {
            message: failure_message(&result),
        });
    }
    let value = result.data.as_ref().and_then(Value::as_i64).unwrap_or(0);
    println!("GPIO on {label} now has value: {}", human_status(value));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_on_for_any_nonzero() {
        assert_eq!(human_status(0), "OFF (0)");
        assert_eq!(human_status(1), "ON (1)");
        assert_eq!(human_status(7), "ON (1)");
    }
}
