// SPDX-License-Identifier: MIT OR Apache-2.0
//! The macro node catalog.
//!
//! Execution nodes carry `exec` pins and are chained from a `start` node.
//! Data nodes only produce or transform values.

use crate::node::{NodeCategory, NodeRegistry, NodeTypeDescriptor, Tier};
use crate::param::ParamSchema;
use crate::port::{DataType, PinSpec};

/// Entry point of a macro
pub const START: &str = "start";
/// Pause
pub const DELAY: &str = "delay";
/// Keyboard key press/hold
pub const KEY_PRESS: &str = "key_press";
/// Mouse button click/hold
pub const MOUSE_CLICK: &str = "mouse_click";
/// Cursor movement
pub const MOUSE_MOVE: &str = "mouse_move";
/// Mouse wheel
pub const MOUSE_SCROLL: &str = "mouse_scroll";
/// Text typing
pub const TYPE_STRING: &str = "type_string";
/// Screen image search
pub const FIND_IMAGE: &str = "find_image";
/// Conditional branch
pub const IF_STATEMENT: &str = "if_statement";
/// Counted loop
pub const LOOP: &str = "loop";
/// Conditional loop
pub const WHILE_LOOP: &str = "while_loop";
/// Function entry point
pub const DEFINE_FUNCTION: &str = "define_function";
/// Function call
pub const CALL_FUNCTION: &str = "call_function";
/// Function return
pub const RETURN_FROM_FUNCTION: &str = "return_from_function";
/// Error handling block
pub const TRY_CATCH: &str = "try_catch";
/// Text literal
pub const STRING_LITERAL: &str = "string_literal";
/// Number literal
pub const NUMBER_LITERAL: &str = "number_literal";
/// Comparison
pub const COMPARE: &str = "compare";
/// Arithmetic
pub const MATH: &str = "math";
/// Variable assignment
pub const SET_VARIABLE: &str = "set_variable";
/// Variable read
pub const GET_VARIABLE: &str = "get_variable";
/// Canvas note
pub const COMMENT: &str = "comment";

/// Name of the inline value field on literal nodes
pub const LITERAL_VALUE: &str = "value";
/// Field holding a function's name on define/call nodes
pub const FUNCTION_NAME: &str = "Function Name";
/// Field holding a variable's name on set/get nodes
pub const VARIABLE_NAME: &str = "Name";
/// Hotkey field of the start node
pub const HOTKEY: &str = "Hotkey";

/// Operators offered by a numeric comparison
pub const NUMBER_OPERATORS: [&str; 6] = ["==", "!=", ">", "<", ">=", "<="];
/// Operators offered by a text comparison
pub const STRING_OPERATORS: [&str; 5] = ["==", "!=", "Contains", "Starts With", "Ends With"];

fn exec_node(id: &str, name: &str, description: &str) -> NodeTypeDescriptor {
    let mut node = NodeTypeDescriptor::new(id, name, NodeCategory::Execution, description);
    node.exec_inputs.push(PinSpec::exec_input("exec"));
    node.exec_outputs.push(PinSpec::exec_output("exec"));
    node
}

fn branch_node(id: &str, name: &str, description: &str, outputs: &[&str]) -> NodeTypeDescriptor {
    let mut node = NodeTypeDescriptor::new(id, name, NodeCategory::Execution, description);
    node.exec_inputs.push(PinSpec::exec_input("exec"));
    node.exec_outputs = outputs.iter().map(|o| PinSpec::exec_output(*o)).collect();
    node
}

/// Create the macro node registry
pub fn create_macro_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();

    // Execution nodes
    let mut start = NodeTypeDescriptor::new(
        START,
        "Start",
        NodeCategory::Execution,
        "The entry point for a macro. Triggered by a hotkey.",
    );
    start.exec_outputs.push(PinSpec::exec_output("exec"));
    start.params = vec![
        ParamSchema::key_combo(HOTKEY, "Not Set"),
        ParamSchema::boolean("Loop Continuously", false),
    ];
    registry.register(start);

    let mut delay = exec_node(DELAY, "Delay", "Pauses the macro for a specified amount of time.");
    delay.data_inputs.push(PinSpec::field(
        DataType::Number,
        ParamSchema::number("Duration", 1.0).with_min(0.01),
    ));
    delay.params.push(ParamSchema::select(
        "Unit",
        "seconds",
        &["Milliseconds", "Seconds", "Minutes"],
    ));
    registry.register(delay);

    let mut key_press = exec_node(
        KEY_PRESS,
        "Key Press",
        "Simulates a keyboard key being pressed, held, or released.",
    );
    key_press.data_inputs.push(PinSpec::field(
        DataType::KeyCombo,
        ParamSchema::key_combo("Key", "Press to record"),
    ));
    key_press.params = vec![
        ParamSchema::select("Action", "press", &["Press", "Hold"]),
        ParamSchema::number("Duration", 0.5)
            .with_min(0.01)
            .visible_when("Action", "hold"),
        ParamSchema::select("Unit", "seconds", &["Milliseconds", "Seconds"]).visible_when("Action", "hold"),
    ];
    registry.register(key_press);

    let mut mouse_click = exec_node(
        MOUSE_CLICK,
        "Mouse Click",
        "Simulates a mouse button being clicked or held.",
    );
    mouse_click.data_inputs.push(PinSpec::field(
        DataType::Number,
        ParamSchema::number("Duration", 0.5)
            .with_min(0.01)
            .visible_when("Action", "hold"),
    ));
    mouse_click.params = vec![
        ParamSchema::select("Button", "left", &["Left", "Right", "Middle"]),
        ParamSchema::select("Action", "click", &["Click", "Double Click", "Hold"]),
        ParamSchema::select("Unit", "seconds", &["Milliseconds", "Seconds"]).visible_when("Action", "hold"),
    ];
    registry.register(mouse_click);

    let mut mouse_move = exec_node(
        MOUSE_MOVE,
        "Mouse Move",
        "Moves the mouse cursor to a specific X/Y coordinate on the screen.",
    );
    mouse_move.data_inputs = vec![
        PinSpec::field(DataType::Number, ParamSchema::number("X", 0.0).with_range(-9999.0, 9999.0)),
        PinSpec::field(DataType::Number, ParamSchema::number("Y", 0.0).with_range(-9999.0, 9999.0)),
        PinSpec::field(
            DataType::Number,
            ParamSchema::number("Duration", 0.25).with_range(0.01, 9999.0),
        ),
    ];
    mouse_move
        .params
        .push(ParamSchema::select("Unit", "seconds", &["Milliseconds", "Seconds"]));
    registry.register(mouse_move);

    let mut mouse_scroll = exec_node(
        MOUSE_SCROLL,
        "Mouse Scroll",
        "Simulates the mouse wheel scrolling up or down.",
    );
    mouse_scroll
        .data_inputs
        .push(PinSpec::field(DataType::Number, ParamSchema::number("Amount", 100.0)));
    mouse_scroll
        .params
        .push(ParamSchema::select("Direction", "down", &["Up", "Down"]));
    registry.register(mouse_scroll);

    let mut type_string = exec_node(TYPE_STRING, "Type String", "Types out a sequence of text characters.");
    type_string.data_inputs = vec![
        PinSpec::field(DataType::String, ParamSchema::string("Text", "Hello, world!")),
        PinSpec::field(DataType::Number, ParamSchema::number("Delay", 50.0).with_range(0.01, 9999.0)),
    ];
    type_string
        .params
        .push(ParamSchema::select("Unit", "milliseconds", &["Milliseconds", "Seconds"]));
    registry.register(type_string);

    let mut find_image = branch_node(
        FIND_IMAGE,
        "Find Image",
        "Searches the screen for a specific image. Executes the \"Found\" or \"Not Found\" path.",
        &["Found", "Not Found"],
    );
    find_image.data_inputs = vec![
        PinSpec::field(DataType::Image, ParamSchema::image("Image")),
        PinSpec::field(
            DataType::Number,
            ParamSchema::number("Confidence", 80.0).with_range(1.0, 100.0),
        ),
    ];
    find_image.data_outputs = vec![
        PinSpec::data_output("X", DataType::Number),
        PinSpec::data_output("Y", DataType::Number),
    ];
    registry.register(find_image);

    let mut if_statement = branch_node(
        IF_STATEMENT,
        "If Statement",
        "Branches the execution flow based on a true/false condition.",
        &["True", "False"],
    );
    if_statement
        .data_inputs
        .push(PinSpec::data_input("Condition", DataType::Boolean));
    registry.register(if_statement);

    let mut for_loop = branch_node(
        LOOP,
        "For Loop",
        "Repeats an execution path a specific number of times.",
        &["Loop Body", "Completed"],
    );
    for_loop.data_inputs.push(PinSpec::field(
        DataType::Number,
        ParamSchema::number("Iterations", 5.0).with_min(1.0),
    ));
    for_loop.data_outputs.push(PinSpec::data_output("Index", DataType::Number));
    registry.register(for_loop);

    let mut while_loop = branch_node(
        WHILE_LOOP,
        "While Loop",
        "Repeats an execution path as long as a condition is true.",
        &["Loop Body", "Completed"],
    );
    while_loop
        .data_inputs
        .push(PinSpec::data_input("Condition", DataType::Boolean));
    registry.register(while_loop);

    let mut define_function = NodeTypeDescriptor::new(
        DEFINE_FUNCTION,
        "Define Function",
        NodeCategory::Execution,
        "Creates an entry point for a reusable function.",
    );
    define_function.exec_outputs.push(PinSpec::exec_output("exec"));
    define_function
        .params
        .push(ParamSchema::string(FUNCTION_NAME, "myFunction"));
    registry.register(define_function);

    let mut call_function = exec_node(CALL_FUNCTION, "Call Function", "Executes a previously defined function.");
    call_function.params.push(ParamSchema::dynamic_select(FUNCTION_NAME));
    registry.register(call_function);

    let mut return_from_function = NodeTypeDescriptor::new(
        RETURN_FROM_FUNCTION,
        "Return",
        NodeCategory::Execution,
        "Returns execution from the current function.",
    );
    return_from_function.exec_inputs.push(PinSpec::exec_input("exec"));
    registry.register(return_from_function);

    let mut try_catch = branch_node(
        TRY_CATCH,
        "Try/Catch",
        "Attempts to run a block of code. If an error occurs, it runs a different block.",
        &["Try", "Catch", "Completed"],
    );
    try_catch.tier = Some(Tier::Pro);
    registry.register(try_catch);

    let mut set_variable = exec_node(SET_VARIABLE, "Set Variable", "Stores a value in a named variable.");
    set_variable.data_inputs = vec![
        PinSpec::field(DataType::String, ParamSchema::string(VARIABLE_NAME, "myVar")),
        PinSpec::data_input("Value", DataType::Any),
    ];
    registry.register(set_variable);

    // Data and logic nodes
    let mut string_literal =
        NodeTypeDescriptor::new(STRING_LITERAL, "String", NodeCategory::Data, "Provides a text (string) value.");
    string_literal.data_inputs.push(
        PinSpec::field(DataType::String, ParamSchema::string(LITERAL_VALUE, "some text")).without_pin(),
    );
    string_literal
        .data_outputs
        .push(PinSpec::data_output("out", DataType::String));
    registry.register(string_literal);

    let mut number_literal =
        NodeTypeDescriptor::new(NUMBER_LITERAL, "Number", NodeCategory::Data, "Provides a numerical value.");
    number_literal
        .data_inputs
        .push(PinSpec::field(DataType::Number, ParamSchema::number(LITERAL_VALUE, 123.0)).without_pin());
    number_literal
        .data_outputs
        .push(PinSpec::data_output("out", DataType::Number));
    registry.register(number_literal);

    let mut compare = NodeTypeDescriptor::new(
        COMPARE,
        "Compare",
        NodeCategory::Data,
        "Compares two values (A and B) and outputs a true/false result.",
    );
    compare.data_inputs = vec![
        PinSpec::data_input("A", DataType::Any),
        PinSpec::data_input("B", DataType::Any),
    ];
    compare.params = vec![
        ParamSchema::select("Type", "number", &["Number", "String"]),
        ParamSchema::select("Operator", "==", &NUMBER_OPERATORS),
    ];
    compare
        .data_outputs
        .push(PinSpec::data_output("Result", DataType::Boolean));
    registry.register(compare);

    let mut math = NodeTypeDescriptor::new(
        MATH,
        "Math",
        NodeCategory::Data,
        "Performs a mathematical operation on two numbers (A and B).",
    );
    math.data_inputs = vec![
        PinSpec::field(DataType::Number, ParamSchema::number("A", 0.0)),
        PinSpec::field(DataType::Number, ParamSchema::number("B", 0.0)),
    ];
    math.params.push(ParamSchema::select(
        "Operator",
        "add",
        &["Add", "Subtract", "Multiply", "Divide"],
    ));
    math.data_outputs
        .push(PinSpec::data_output("Result", DataType::Number));
    registry.register(math);

    let mut get_variable = NodeTypeDescriptor::new(
        GET_VARIABLE,
        "Get Variable",
        NodeCategory::Data,
        "Retrieves a value from a named variable.",
    );
    get_variable.data_inputs.push(
        PinSpec::field(DataType::String, ParamSchema::dynamic_select(VARIABLE_NAME)).without_pin(),
    );
    get_variable
        .data_outputs
        .push(PinSpec::data_output("Value", DataType::Any));
    registry.register(get_variable);

    registry.register(NodeTypeDescriptor::new(
        COMMENT,
        "Comment",
        NodeCategory::Annotation,
        "A resizable text box for adding notes to the canvas.",
    ));

    registry
}
