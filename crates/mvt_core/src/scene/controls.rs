//! On-screen controls: group toggles, the division slider, the function
//! input box and screen-attached texts.
//!
//! Controls are permanent. They survive every rebuild and live on the
//! control layer above the construction.

use crate::config::{SceneConfig, SliderConfig};
use crate::group::visibility::VisibilityGroups;
use crate::model::color::Color;
use crate::model::handle::Handle;
use crate::scene::SceneError;
use crate::sync::creation::CreateOptions;
use crate::sync::tracker::CreationTracker;
use log::info;

/// Layer holding every control, above all group layers.
pub const CONTROL_LAYER: u8 = 9;

const TOGGLE_X: u32 = 5;
const TOGGLE_TITLE_X: u32 = 45;
const SLIDER_X: u32 = 25;
const INPUT_BOX_X: u32 = 10;
const WIDGET_GAP: u32 = 50;
/// Attached texts sit this far below their requested row.
const TEXT_BASELINE_SHIFT: u32 = 23;

/// Vertical cursor walking down the control column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlLayout {
    cursor: u32,
    row_height: u32,
}

impl ControlLayout {
    pub fn new(config: &SceneConfig) -> Self {
        Self {
            cursor: config.control_y_offset,
            row_height: config.control_row_height,
        }
    }

    /// Returns the current row and moves one row down.
    pub fn take_row(&mut self) -> u32 {
        let row = self.cursor;
        self.cursor += self.row_height;
        row
    }

    /// Moves down by one widget gap and returns the new position.
    pub fn skip_widget(&mut self) -> u32 {
        self.cursor += WIDGET_GAP;
        self.cursor
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }
}

/// Text pinned to screen coordinates instead of the graph.
#[derive(Debug, Clone)]
pub struct AttachedText<'a> {
    pub label: &'a str,
    /// Expression evaluated by the store, quoted when literal.
    pub value: &'a str,
    pub x: u32,
    pub y: u32,
    pub color: Color,
    pub background: Color,
    pub permanent: bool,
}

pub async fn attached_text(
    tracker: &CreationTracker,
    text: AttachedText<'_>,
) -> Result<Handle, SceneError> {
    let command = format!(
        "{} = Text({}, AttachCopyToView((1,1), 1, (1,1), (0,0), ({},{} + {TEXT_BASELINE_SHIFT}), (0,0)))",
        text.label, text.value, text.x, text.y
    );
    let options = if text.permanent {
        CreateOptions::permanent()
    } else {
        CreateOptions::new()
    };
    let handle = tracker.create(&command, options).await?;

    let store = tracker.store();
    store.set_color(&handle, text.color);
    store.eval_command(&format!(
        "SetBackgroundColor({handle}, \"{}\")",
        text.background.to_hex()
    ));
    store.set_layer(&handle, CONTROL_LAYER);
    store.set_fixed(&handle, true, true);
    Ok(handle)
}

/// Creates one checkbox per group, checked, and binds it to its group.
pub async fn setup_group_toggles(
    tracker: &CreationTracker,
    groups: &VisibilityGroups,
    layout: &mut ControlLayout,
) -> Result<Vec<Handle>, SceneError> {
    let specs = groups.specs();
    let mut toggles = Vec::with_capacity(specs.len());
    for (index, spec) in specs.iter().enumerate() {
        let row = layout.take_row();
        let toggle = tracker
            .create(
                &format!("b_g_{{{index}}} = Checkbox()"),
                CreateOptions::permanent(),
            )
            .await?;

        let store = tracker.store();
        store.set_label_visible(&toggle, false);
        store.set_value(&toggle, 1.0);
        store.set_layer(&toggle, CONTROL_LAYER);
        store.eval_command(&format!("SetCoords({toggle}, {TOGGLE_X}, {row})"));

        attached_text(
            tracker,
            AttachedText {
                label: &format!("t_g_{{{index}}}"),
                value: &format!("\"{}\"", spec.title),
                x: TOGGLE_TITLE_X,
                y: row,
                color: spec.label_text_color,
                background: spec.color,
                permanent: true,
            },
        )
        .await?;

        groups.bind_toggle(&spec.key, toggle.clone())?;
        toggles.push(toggle);
    }
    info!(
        "event=group_toggles module=scene status=ok count={}",
        toggles.len()
    );
    Ok(toggles)
}

/// Creates the fixed division-count slider `k`.
pub async fn create_slider(
    tracker: &CreationTracker,
    range: &SliderConfig,
    layout: &mut ControlLayout,
) -> Result<Handle, SceneError> {
    let slider = tracker
        .create(
            &format!("k = Slider({}, {}, {})", range.min, range.max, range.step),
            CreateOptions::permanent(),
        )
        .await?;
    let row = layout.skip_widget();

    let store = tracker.store();
    store.set_fixed(&slider, true, true);
    store.eval_command(&format!("SetCoords({slider}, {SLIDER_X}, {row})"));
    Ok(slider)
}

/// Creates the input box editing `function`.
pub async fn create_function_input(
    tracker: &CreationTracker,
    function: &Handle,
    layout: &mut ControlLayout,
) -> Result<Handle, SceneError> {
    let input = tracker
        .create(&format!("InputBox({function})"), CreateOptions::permanent())
        .await?;
    let row = layout.skip_widget();

    let store = tracker.store();
    store.set_fixed(&input, true, true);
    store.eval_command(&format!("SetCoords({input}, {INPUT_BOX_X}, {row})"));
    store.set_caption(&input, &format!("${function}(x)$"));
    Ok(input)
}
