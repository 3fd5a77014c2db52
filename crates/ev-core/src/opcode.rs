/// Opcodes the interpreter has handlers for. Any other code is carried through
/// compilation untouched and skipped at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Empty,
    ShowChoices,
    WhenChoice,
    WhenCancel,
    ChoicesEnd,
    Comment,
    ConditionalBranch,
    Else,
    BranchEnd,
    Loop,
    RepeatAbove,
    BreakLoop,
    ExitEventProcessing,
    CommonEvent,
    Label,
    JumpToLabel,
    ControlSwitches,
    ControlVariables,
    ControlSelfSwitch,
    Wait,
    Script,
    PluginCommand,
}

/// Continuation line of a comment block; never executed on its own.
pub const COMMENT_CONTINUATION_CODE: i32 = 408;
/// Continuation line of a script block; never executed on its own.
pub const SCRIPT_CONTINUATION_CODE: i32 = 655;

/// `ConditionalBranch` kind whose condition is an embedded expression.
pub const CONDITION_KIND_SCRIPT: i64 = 12;
/// `ControlVariables` operand kind whose value is an embedded expression.
pub const OPERAND_KIND_SCRIPT: i64 = 4;

impl Opcode {
    pub const COUNT: usize = 22;

    pub const ALL: [Opcode; Self::COUNT] = [
        Opcode::Empty,
        Opcode::ShowChoices,
        Opcode::WhenChoice,
        Opcode::WhenCancel,
        Opcode::ChoicesEnd,
        Opcode::Comment,
        Opcode::ConditionalBranch,
        Opcode::Else,
        Opcode::BranchEnd,
        Opcode::Loop,
        Opcode::RepeatAbove,
        Opcode::BreakLoop,
        Opcode::ExitEventProcessing,
        Opcode::CommonEvent,
        Opcode::Label,
        Opcode::JumpToLabel,
        Opcode::ControlSwitches,
        Opcode::ControlVariables,
        Opcode::ControlSelfSwitch,
        Opcode::Wait,
        Opcode::Script,
        Opcode::PluginCommand,
    ];

    /// Dense slot of this opcode in a dispatch table.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn code(self) -> i32 {
        match self {
            Opcode::Empty => 0,
            Opcode::ShowChoices => 102,
            Opcode::WhenChoice => 402,
            Opcode::WhenCancel => 403,
            Opcode::ChoicesEnd => 404,
            Opcode::Comment => 108,
            Opcode::ConditionalBranch => 111,
            Opcode::Else => 411,
            Opcode::BranchEnd => 412,
            Opcode::Loop => 112,
            Opcode::RepeatAbove => 413,
            Opcode::BreakLoop => 113,
            Opcode::ExitEventProcessing => 115,
            Opcode::CommonEvent => 117,
            Opcode::Label => 118,
            Opcode::JumpToLabel => 119,
            Opcode::ControlSwitches => 121,
            Opcode::ControlVariables => 122,
            Opcode::ControlSelfSwitch => 123,
            Opcode::Wait => 230,
            Opcode::Script => 355,
            Opcode::PluginCommand => 356,
        }
    }

    pub const fn from_code(code: i32) -> Option<Opcode> {
        let opcode = match code {
            0 => Opcode::Empty,
            102 => Opcode::ShowChoices,
            402 => Opcode::WhenChoice,
            403 => Opcode::WhenCancel,
            404 => Opcode::ChoicesEnd,
            108 => Opcode::Comment,
            111 => Opcode::ConditionalBranch,
            411 => Opcode::Else,
            412 => Opcode::BranchEnd,
            112 => Opcode::Loop,
            413 => Opcode::RepeatAbove,
            113 => Opcode::BreakLoop,
            115 => Opcode::ExitEventProcessing,
            117 => Opcode::CommonEvent,
            118 => Opcode::Label,
            119 => Opcode::JumpToLabel,
            121 => Opcode::ControlSwitches,
            122 => Opcode::ControlVariables,
            123 => Opcode::ControlSelfSwitch,
            230 => Opcode::Wait,
            355 => Opcode::Script,
            356 => Opcode::PluginCommand,
            _ => return None,
        };
        Some(opcode)
    }

    /// Control-flow opcodes whose handler reads a jump-table entry that the
    /// compiler must have resolved.
    pub const fn requires_jump_target(self) -> bool {
        matches!(
            self,
            Opcode::Comment
                | Opcode::ConditionalBranch
                | Opcode::Else
                | Opcode::WhenChoice
                | Opcode::WhenCancel
                | Opcode::RepeatAbove
                | Opcode::BreakLoop
        )
    }
}
