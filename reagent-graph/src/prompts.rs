//! Default prompt templates. The control flow does not depend on this
//! wording; only the slot names are load-bearing.

pub const DEFAULT_PLANNER_PROMPT: &str = "\
You are a planning assistant. Given the tools below, the previous \
conversation and a new user input, produce a numbered, high-level plan for \
completing the task. Each step should name a tool call from [TOOLS], a \
reference to the conversation history, or a response to the user. Use as few \
steps as possible; the final step must answer the user. Reply with the \
numbered steps only.

[TOOLS]
{{tools}}
[/TOOLS]

Previous conversation:
{{messages}}

New user input: {{input}}

Numbered list of steps:
";

pub const DEFAULT_REACT_PROMPT: &str = "\
You are an assistant that completes tasks by calling tools. Follow the plan, \
one tool call at a time.

You have access to the following tools:

[TOOLS]
{{tools}}
[/TOOLS]

To call a tool, reply exactly in this form, then stop:

Thought: (what you need next)
Action: (one of [{{tool_names}}])
Action Input: (the arguments as JSON, double-quoted strings)
STOP

Each result arrives as \"Observation: <result>\". A mistake arrives as \
\"Error: <message>\"; adapt your next step and never repeat a failed call \
with the same parameters.

When the plan is complete, reply with the final answer:

Agent: (your answer to the user)
STOP

[CONVERSATION_HISTORY]
{{messages}}User: {{input}}
[/CONVERSATION_HISTORY]

[PLAN]
{{plan}}
[/PLAN]

[WORKSPACE]
{{scratchpad}}
";

pub const DEFAULT_OBSERVER_PROMPT: &str = "\
A tool was just executed as part of a task. Summarize what the result \
contributes toward the goal stated in the thought, in one short paragraph \
beginning with \"Observation:\". Preserve exact values and units.

Thought: {{thought}}
Action: {{action}}
Action Input: {{action_input}}
Tool result: {{tool_output}}

Observation:";
