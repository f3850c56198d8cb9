//! Block helpers: `switch`/`case` and `first`.
//!
//! A `switch` pushes its own frame onto the render context's block stack,
//! holding the switch value and whether a `case` has matched. The frame is a
//! copy of the enclosing block, so paths and `@` variables inside the body
//! resolve exactly as they would outside it, and it is popped when the block
//! ends. Nested and sibling switches therefore never see each other's state.

use handlebars::{
    BlockContext, Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext,
    RenderErrorReason, Renderable, StringOutput,
};
use serde_json::Value as Json;

use super::same_value;

const SWITCH_VALUE: &str = "switch_value";
const SWITCH_MATCHED: &str = "switch_matched";

pub struct SwitchHelper;

impl HelperDef for SwitchHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let value = h.param(0).map_or(Json::Null, |p| p.value().clone());

        let mut frame = rc.block().cloned().unwrap_or_else(BlockContext::new);
        frame.set_local_var(SWITCH_VALUE, value);
        frame.set_local_var(SWITCH_MATCHED, Json::Bool(false));
        rc.push_block(frame);

        let mut body = StringOutput::new();
        let rendered = match h.template() {
            Some(t) => t.render(r, ctx, rc, &mut body),
            None => Ok(()),
        };
        let matched = rc
            .block()
            .and_then(|frame| frame.get_local_var(SWITCH_MATCHED))
            .and_then(Json::as_bool)
            .unwrap_or(false);
        rc.pop_block();
        rendered?;

        if matched {
            let body = body
                .into_string()
                .map_err(|e| RenderErrorReason::Other(e.to_string()))?;
            out.write(&body)?;
        } else if let Some(inverse) = h.inverse() {
            inverse.render(r, ctx, rc, out)?;
        }
        Ok(())
    }
}

pub struct CaseHelper;

impl HelperDef for CaseHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        // Only the innermost block is consulted; a case nested inside another
        // context-changing block is outside its switch.
        let hit = rc.block().is_some_and(|frame| {
            match (
                frame.get_local_var(SWITCH_VALUE),
                frame.get_local_var(SWITCH_MATCHED),
            ) {
                (Some(value), Some(Json::Bool(false))) => {
                    h.params().iter().any(|p| same_value(p.value(), value))
                }
                _ => false,
            }
        });
        if !hit {
            return Ok(());
        }

        if let Some(frame) = rc.block_mut() {
            frame.set_local_var(SWITCH_MATCHED, Json::Bool(true));
        }
        if let Some(t) = h.template() {
            t.render(r, ctx, rc, out)?;
        }
        Ok(())
    }
}

/// `{{#first container}}`: renders the body with the first element of a
/// sequence, or the first value of a mapping (its key in `@key`). Empty or
/// non-container values render the else arm.
pub struct FirstHelper;

impl HelperDef for FirstHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let first = match h.param(0).map(|p| p.value()) {
            Some(Json::Array(items)) => items.first().map(|item| (item.clone(), None)),
            Some(Json::Object(map)) => map
                .iter()
                .next()
                .map(|(key, value)| (value.clone(), Some(key.clone()))),
            _ => None,
        };

        let Some((value, key)) = first else {
            if let Some(inverse) = h.inverse() {
                inverse.render(r, ctx, rc, out)?;
            }
            return Ok(());
        };

        let mut block = BlockContext::new();
        block.set_base_value(value);
        if let Some(key) = key {
            block.set_local_var("key", Json::String(key));
        }
        rc.push_block(block);
        let rendered = match h.template() {
            Some(t) => t.render(r, ctx, rc, out),
            None => Ok(()),
        };
        rc.pop_block();
        rendered
    }
}
