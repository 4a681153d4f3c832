//! Blink router LEDs so a device can be found on the rack.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::cli::{FlashledsArgs, GlobalOpts};
use crate::error::CliError;
use crate::session::Context;

use super::util;

const MIN_FLASH_DELAY: Duration = Duration::from_millis(200);

pub async fn handle(ctx: &Context, args: FlashledsArgs, _global: &GlobalOpts) -> Result<(), CliError> {
    let deadline = match args.duration {
        Some(secs) if secs.is_finite() && secs > 0.0 => {
            Some(Instant::now() + Duration::from_secs_f64(secs))
        }
        Some(_) => {
            return Err(CliError::Validation {
                field: "duration".into(),
                reason: "must be a positive number of seconds".into(),
            });
        }
        None => None,
    };
    let routers = util::resolve_routers(ctx, &args.routers).await?;
    let ids = util::router_ids(&routers);
    println!("Flashing LEDS for:");
    for r in &routers {
        println!("    {}", util::label(&r.name, &r.id));
    }

    let mut on = false;
    loop {
        on = !on;
        let start = Instant::now();
        ctx.client.set_leds(&ids, on).await?;
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        tokio::time::sleep(MIN_FLASH_DELAY.saturating_sub(start.elapsed())).await;
    }
    if on {
        debug!("leaving LEDs off");
        ctx.client.set_leds(&ids, false).await?;
    }
    Ok(())
}
