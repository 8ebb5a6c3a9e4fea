//! # Placement feasibility
//!
//! The physical laws of the block world, phrased as a single question: may
//! object `a` be released onto (or into) object `b`? The same rules filter
//! candidate goal literals during interpretation and gate the `drop`
//! primitive during planning and execution.

use crate::world::{Form, ObjectSpec, Size};

fn outsizes(a: &ObjectSpec, b: &ObjectSpec) -> bool {
    a.size == Size::Large && b.size == Size::Small
}

/// Whether `a` may rest directly on `b`. Dropping into a box counts as
/// resting on the box itself.
pub fn can_place(a: &ObjectSpec, b: &ObjectSpec) -> bool {
    match b.form {
        // The floor accepts everything.
        Form::Floor => true,
        // A ball accepts nothing above it.
        Form::Ball => false,
        Form::Box => {
            if outsizes(a, b) {
                return false;
            }
            match a.form {
                Form::Pyramid | Form::Plank | Form::Box => {
                    b.size == Size::Large && a.size == Size::Small
                }
                _ => true,
            }
        }
        _ => {
            if outsizes(a, b) {
                return false;
            }
            match a.form {
                // Balls rest only on the floor or in boxes.
                Form::Ball => false,
                Form::Box => {
                    let small_on_small = a.size == Size::Small
                        && b.size == Size::Small
                        && matches!(b.form, Form::Brick | Form::Pyramid);
                    let large_on_pyramid =
                        a.size == Size::Large && b.form == Form::Pyramid;
                    !(small_on_small || large_on_pyramid)
                }
                _ => true,
            }
        }
    }
}

/// Whether `a` could ever sit somewhere above `b` in the same stack. Used
/// for validating `above`/`under` goal literals: everything in a stack is
/// transitively supported by what lies below it.
pub fn can_stack_above(a: &ObjectSpec, b: &ObjectSpec) -> bool {
    b.form != Form::Ball && !outsizes(a, b)
}
