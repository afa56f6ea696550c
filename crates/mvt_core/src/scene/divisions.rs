//! Subdivision construction rebuilt on every input change.
//!
//! # Responsibility
//! - Split the interval into `n` divisions and draw, per division, the secant,
//!   its slope, the mean-value abscissa μ solving `f' = slope`, the tangent at
//!   μ and the derivative ordinate at μ.
//! - Average the division slopes into the level term, solve it over the whole
//!   interval and draw the quadrature rectangle under `f'`.
//!
//! # Invariants
//! - Every object created here is transient.
//! - With a single division the interval secant and the averaged slope are not
//!   created; the division's own μ serves as the level term.
//! - Division counts outside `1..=MAX_DIVISIONS` are rejected before anything
//!   is created.

use crate::config::{
    GROUP_DIVISION, GROUP_DIVISION_SECANT, GROUP_DIVISION_TANGENT, GROUP_INTERVAL_SECANT,
    GROUP_IRREGULAR, GROUP_LEVEL_TERM, GROUP_LEVEL_TERM_TANGENT, GROUP_MU_ABSCISSAS,
    GROUP_MU_ORDINATES, GROUP_QUADRATURE, MAX_DIVISIONS,
};
use crate::model::handle::Handle;
use crate::scene::controls::{attached_text, AttachedText};
use crate::scene::style::{patch_line_opacity, OPAQUE_LINE};
use crate::scene::{SceneContext, SceneError};
use crate::sync::creation::CreateOptions;
use log::info;
use std::rc::Rc;

const DIVIDER_THICKNESS: u32 = 12;
const AREA_TEXT_X: u32 = 15;
const QUADRATURE_TEXT_OFFSET: u32 = 50;
const IRREGULAR_TEXT_OFFSET: u32 = 80;

/// Handles one division contributes to the level term.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Division {
    slope: Handle,
    mu: Handle,
}

/// Builds the whole construction for `divisions` divisions.
pub async fn build(ctx: &SceneContext, divisions: u32) -> Result<(), SceneError> {
    if divisions == 0 || divisions > MAX_DIVISIONS {
        return Err(SceneError::InvalidDivisionCount(divisions));
    }
    info!(
        "event=rebuild module=scene status=start divisions={divisions} generation={}",
        ctx.tracker.generation()
    );

    let first = division_point(ctx, 1).await?;
    let mut previous = first.clone();
    let mut built = Vec::new();
    for index in 1..=divisions {
        let current = division_point(ctx, index + 1).await?;
        built.push(division(ctx, index, &previous, &current).await?);
        previous = current;
    }

    let level_mu = match built.as_slice() {
        [single] => single.mu.clone(),
        _ => level_term(ctx, &first, &previous, &built).await?,
    };
    quadrature(ctx, &level_mu, built.len() > 1).await?;

    info!(
        "event=rebuild module=scene status=ok divisions={divisions} transient={}",
        ctx.tracker.transient_handles().len()
    );
    Ok(())
}

/// `F_{Di}` on the graph, with its vertical divider.
async fn division_point(ctx: &SceneContext, index: u32) -> Result<Handle, SceneError> {
    let anchors = &ctx.anchors;
    let abscissa = ctx
        .create(&format!(
            "x_{{D{index}}} = {}({index})",
            anchors.division_abscissa
        ))
        .await?;
    let point = ctx
        .create(&format!(
            "F_{{D{index}}} = ({abscissa}, {}({abscissa}))",
            anchors.function
        ))
        .await?;
    ctx.show_in(&point, GROUP_DIVISION)?;

    let divider = ctx
        .create(&format!("V_{{D{index}}} = Segment((x({point}), 0), {point})"))
        .await?;
    ctx.show_in(&divider, GROUP_DIVISION)?;
    ctx.store.set_line_thickness(&divider, DIVIDER_THICKNESS);
    patch_line_opacity(ctx.store.as_ref(), &divider, OPAQUE_LINE);
    Ok(point)
}

/// Secant, slope, μ, tangent and μ ordinate of division `index`.
async fn division(
    ctx: &SceneContext,
    index: u32,
    previous: &Handle,
    current: &Handle,
) -> Result<Division, SceneError> {
    let secant = ctx
        .create(&format!("S_{{D{index}}} = Segment({previous}, {current})"))
        .await?;
    ctx.show_in(&secant, GROUP_DIVISION_SECANT)?;
    patch_line_opacity(ctx.store.as_ref(), &secant, OPAQUE_LINE);

    let slope = ctx
        .create(&format!(
            "s_{{D{index}}} = (y({previous}) - y({current})) / (x({previous}) - x({current}))"
        ))
        .await?;

    let mu = solve_for_slope(ctx, &format!("μ_{{{index}}}"), &slope, previous, current).await?;
    ctx.show_in(&mu, GROUP_MU_ABSCISSAS)?;

    tangent(ctx, &format!("D{index}"), &mu, &slope, GROUP_DIVISION_TANGENT).await?;

    let derivative = &ctx.anchors.derivative;
    let ordinate = ctx
        .create(&format!(
            "F_{{μ{index}}} = (x({mu}), {derivative}(x({mu})))"
        ))
        .await?;
    ctx.show_in(&ordinate, GROUP_MU_ORDINATES)?;

    let drop_line = ctx
        .create(&format!("V_{{μ{index}}} = Segment({ordinate}, {mu})"))
        .await?;
    ctx.show_in(&drop_line, GROUP_MU_ORDINATES)?;
    patch_line_opacity(ctx.store.as_ref(), &drop_line, OPAQUE_LINE);

    Ok(Division { slope, mu })
}

/// Interval secant, averaged slope and its μ over the whole interval.
async fn level_term(
    ctx: &SceneContext,
    first: &Handle,
    last: &Handle,
    divisions: &[Division],
) -> Result<Handle, SceneError> {
    let secant = ctx
        .create(&format!("S_I = Segment({first}, {last})"))
        .await?;
    ctx.show_in(&secant, GROUP_INTERVAL_SECANT)?;
    patch_line_opacity(ctx.store.as_ref(), &secant, OPAQUE_LINE);

    let terms = divisions
        .iter()
        .map(|division| division.slope.as_str())
        .collect::<Vec<_>>()
        .join(" + ");
    let mean = ctx
        .create(&format!("s_G = ({terms}) / {}", divisions.len()))
        .await?;

    let anchors = Rc::clone(&ctx.anchors);
    let mu = solve_for_slope(ctx, "μ", &mean, &anchors.start_point, &anchors.end_point).await?;
    ctx.show_in(&mu, GROUP_LEVEL_TERM)?;

    tangent(ctx, "G", &mu, &mean, GROUP_LEVEL_TERM_TANGENT).await?;
    Ok(mu)
}

/// First point on `[x(lower), x(upper)]` where `f'` equals `slope`.
async fn solve_for_slope(
    ctx: &SceneContext,
    label: &str,
    slope: &Handle,
    lower: &Handle,
    upper: &Handle,
) -> Result<Handle, SceneError> {
    let derivative = &ctx.anchors.derivative;
    ctx.create(&format!(
        "{label} = Point({{Element(KeepIf(x >= x({lower}) && x <= x({upper}), NSolutions({derivative} = {slope})), 1), 0}})"
    ))
    .await
}

/// Fixed-length tangent segment to `f` at `x(mu)` plus its touching point.
async fn tangent(
    ctx: &SceneContext,
    name: &str,
    mu: &Handle,
    slope: &Handle,
    group: &str,
) -> Result<(), SceneError> {
    let function = &ctx.anchors.function;
    let line = ctx
        .create(&format!(
            "t_{{{name}}}(x) = {slope} * (x - x({mu})) + {function}(x({mu}))"
        ))
        .await?;
    ctx.store.set_visible(&line, false);

    // Horizontal half-extent of a segment of length `tangent_length` at this slope.
    let half_width = ctx
        .create(&format!(
            "a_{{{name}}} = {} / sqrt(4*{slope}^2 + 4)",
            ctx.config.tangent_length
        ))
        .await?;
    let start = format!("x({mu}) - {half_width}");
    let end = format!("x({mu}) + {half_width}");
    let segment = ctx
        .create(&format!(
            "t_s_{{{name}}} = Segment(({start}, {line}({start})), ({end}, {line}({end})))"
        ))
        .await?;
    ctx.show_in(&segment, group)?;
    patch_line_opacity(ctx.store.as_ref(), &segment, OPAQUE_LINE);

    let touch = ctx
        .create(&format!(
            "T_{{{name}}} = Point({{x({mu}), {function}(x({mu}))}})"
        ))
        .await?;
    ctx.show_in(&touch, group)?;
    Ok(())
}

/// Rectangle of height `f'(x(mu))` over the interval, with both area texts.
async fn quadrature(ctx: &SceneContext, mu: &Handle, averaged: bool) -> Result<(), SceneError> {
    let anchors = Rc::clone(&ctx.anchors);
    let derivative = &anchors.derivative;
    let level = ctx
        .create(&format!(
            "L_{{f'}} = Point({{x({mu}), {derivative}(x({mu}))}})"
        ))
        .await?;
    if averaged {
        ctx.show_in(&level, GROUP_LEVEL_TERM)?;
        let drop_line = ctx
            .create(&format!("V_{{f'}} = Segment({level}, {mu})"))
            .await?;
        ctx.show_in(&drop_line, GROUP_LEVEL_TERM)?;
        patch_line_opacity(ctx.store.as_ref(), &drop_line, OPAQUE_LINE);
    } else {
        ctx.store.set_visible(&level, false);
    }

    let start_top = ctx
        .create(&format!(
            "Q_{{A'}} = Point({{x({}), y({level})}})",
            anchors.start_point
        ))
        .await?;
    ctx.store.set_visible(&start_top, false);
    let end_top = ctx
        .create(&format!(
            "Q_{{B'}} = Point({{x({}), y({level})}})",
            anchors.end_point
        ))
        .await?;
    ctx.store.set_visible(&end_top, false);

    let quadrature_spec = ctx
        .groups
        .specs()
        .into_iter()
        .find(|spec| spec.key == GROUP_QUADRATURE);
    let side_layer = quadrature_spec.as_ref().map_or(0, |spec| spec.layer);
    let store = Rc::clone(&ctx.store);
    let polygon = ctx
        .create_with(
            &format!(
                "Q_{{f'}} = Polygon({}, {}, {end_top}, {start_top})",
                anchors.start_point, anchors.end_point
            ),
            CreateOptions::new().on_secondary_alive(move |side: &Handle| {
                store.set_label_visible(side, false);
                store.set_layer(side, side_layer);
            }),
        )
        .await?;
    ctx.show_in(&polygon, GROUP_QUADRATURE)?;
    ctx.store.set_filling(&polygon, ctx.config.area_filling);

    let irregular_spec = ctx
        .groups
        .specs()
        .into_iter()
        .find(|spec| spec.key == GROUP_IRREGULAR);
    let texts = [
        (
            "A_{Qf'}",
            format!("\"Quadrature Area: \" + {polygon}"),
            QUADRATURE_TEXT_OFFSET,
            quadrature_spec,
        ),
        (
            "A_{If'}",
            format!("\"Irregular Area: \" + {}", anchors.integral_area),
            IRREGULAR_TEXT_OFFSET,
            irregular_spec,
        ),
    ];
    for (label, value, offset, spec) in texts {
        let Some(spec) = spec else {
            continue;
        };
        ctx.ensure_current()?;
        attached_text(
            &ctx.tracker,
            AttachedText {
                label,
                value: &value,
                x: AREA_TEXT_X,
                y: anchors.text_anchor_y + offset,
                color: spec.label_text_color,
                background: spec.color,
                permanent: false,
            },
        )
        .await?;
    }
    Ok(())
}
