// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish a goal: training
// the two-stage model, or explaining a corpus with a trained one.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No UI or printing here (that's Layer 1)
//   - No direct file parsing here (that's Layers 4 and 6)
//   - Only workflow coordination

// The two-stage training workflow
pub mod train_use_case;

// The prediction + rationale-extraction workflow
pub mod explain_use_case;
