use crate::app::InputMode;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Down,
    Up,
    PageDown,
    PageUp,
    Top,
    Bottom,
    NextView,
    PrevView,
    SelectView(u8),
    ToggleHelp,
    StartCommand,
    Refresh,
    Open,
    Close,
    NextDetailTab,
    PrevDetailTab,
    CycleManifestView,
    ToggleManifestFormat,
    SyncResource,
    DeleteResource,
    OpenCreateDialog,
    ToggleTheme,
    CycleLocale,
    ConfirmYes,
    ConfirmNo,
    Click { column: u16, row: u16 },
    ScrollDown,
    ScrollUp,
    SubmitInput,
    CancelInput,
    Backspace,
    InputChar(char),
    NextField,
    CycleDialogMode,
}

pub fn map_key(mode: InputMode, key: KeyEvent) -> Option<Action> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Action::Quit);
    }
    match mode {
        InputMode::Normal => map_normal_mode_key(key),
        InputMode::Command => map_command_mode_key(key),
        InputMode::Dialog => map_dialog_key(key),
        InputMode::Login => map_login_key(key),
    }
}

pub fn map_mouse(mouse: MouseEvent) -> Option<Action> {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(Action::Click {
            column: mouse.column,
            row: mouse.row,
        }),
        MouseEventKind::ScrollDown => Some(Action::ScrollDown),
        MouseEventKind::ScrollUp => Some(Action::ScrollUp),
        _ => None,
    }
}

fn map_normal_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char(c @ '1'..='4') if key.modifiers.is_empty() => {
            c.to_digit(10).map(|digit| Action::SelectView(digit as u8))
        }
        KeyCode::Char('j') if key.modifiers.is_empty() => Some(Action::Down),
        KeyCode::Down => Some(Action::Down),
        KeyCode::Char('k') if key.modifiers.is_empty() => Some(Action::Up),
        KeyCode::Up => Some(Action::Up),
        KeyCode::Left | KeyCode::Char('h') => Some(Action::PrevView),
        KeyCode::Right | KeyCode::Char('l') => Some(Action::NextView),
        KeyCode::Char('g') | KeyCode::Home => Some(Action::Top),
        KeyCode::Char('G') | KeyCode::End => Some(Action::Bottom),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::PageDown)
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::PageUp),
        KeyCode::Char('?') => Some(Action::ToggleHelp),
        KeyCode::Char('r') | KeyCode::F(5) => Some(Action::Refresh),
        KeyCode::Char(':') => Some(Action::StartCommand),
        KeyCode::Char(';') if key.modifiers.contains(KeyModifiers::SHIFT) => {
            Some(Action::StartCommand)
        }
        KeyCode::Enter => Some(Action::Open),
        KeyCode::Esc => Some(Action::Close),
        KeyCode::Char(']') | KeyCode::Tab => Some(Action::NextDetailTab),
        KeyCode::Char('[') | KeyCode::BackTab => Some(Action::PrevDetailTab),
        KeyCode::Char('m') if key.modifiers.is_empty() => Some(Action::CycleManifestView),
        KeyCode::Char('f') if key.modifiers.is_empty() => Some(Action::ToggleManifestFormat),
        KeyCode::Char('S') => Some(Action::SyncResource),
        KeyCode::Char('D') => Some(Action::DeleteResource),
        KeyCode::Char('c') if key.modifiers.is_empty() => Some(Action::OpenCreateDialog),
        KeyCode::Char('t') if key.modifiers.is_empty() => Some(Action::ToggleTheme),
        KeyCode::Char('L') => Some(Action::CycleLocale),
        KeyCode::Char('y') | KeyCode::Char('Y') => Some(Action::ConfirmYes),
        KeyCode::Char('n') | KeyCode::Char('N') => Some(Action::ConfirmNo),
        _ => None,
    }
}

fn map_command_mode_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc => Some(Action::CancelInput),
        KeyCode::Enter => Some(Action::SubmitInput),
        KeyCode::Char('m') | KeyCode::Char('j')
            if key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            Some(Action::SubmitInput)
        }
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(c)
            if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
        {
            Some(Action::InputChar(c))
        }
        _ => None,
    }
}

fn map_dialog_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc => Some(Action::CancelInput),
        KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Action::SubmitInput)
        }
        KeyCode::F(2) => Some(Action::CycleDialogMode),
        KeyCode::Tab => Some(Action::NextField),
        KeyCode::Enter => Some(Action::InputChar('\n')),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(c)
            if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
        {
            Some(Action::InputChar(c))
        }
        _ => None,
    }
}

fn map_login_key(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc => Some(Action::CancelInput),
        KeyCode::Enter => Some(Action::SubmitInput),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Down | KeyCode::Up => Some(Action::NextField),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Char(c)
            if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
        {
            Some(Action::InputChar(c))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, map_key, map_mouse};
    use crate::app::InputMode;
    use crossterm::event::{
        KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    };

    #[test]
    fn normal_mode_maps_quit() {
        let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert_eq!(map_key(InputMode::Normal, key), Some(Action::Quit));
    }

    #[test]
    fn ctrl_c_quits_from_every_mode() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        for mode in [
            InputMode::Normal,
            InputMode::Command,
            InputMode::Dialog,
            InputMode::Login,
        ] {
            assert_eq!(map_key(mode, key), Some(Action::Quit));
        }
    }

    #[test]
    fn command_mode_maps_char() {
        let key = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        assert_eq!(map_key(InputMode::Command, key), Some(Action::InputChar('a')));
    }

    #[test]
    fn normal_mode_maps_panel_keys() {
        let cases = [
            (KeyCode::Enter, KeyModifiers::NONE, Action::Open),
            (KeyCode::Esc, KeyModifiers::NONE, Action::Close),
            (KeyCode::Char(']'), KeyModifiers::NONE, Action::NextDetailTab),
            (KeyCode::Char('m'), KeyModifiers::NONE, Action::CycleManifestView),
            (KeyCode::Char('f'), KeyModifiers::NONE, Action::ToggleManifestFormat),
            (KeyCode::Char('S'), KeyModifiers::SHIFT, Action::SyncResource),
            (KeyCode::Char('D'), KeyModifiers::SHIFT, Action::DeleteResource),
            (KeyCode::Char('2'), KeyModifiers::NONE, Action::SelectView(2)),
        ];
        for (code, modifiers, expected) in cases {
            assert_eq!(
                map_key(InputMode::Normal, KeyEvent::new(code, modifiers)),
                Some(expected)
            );
        }
    }

    #[test]
    fn dialog_maps_ctrl_s_to_submit_and_enter_to_newline() {
        let ctrl_s = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL);
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        let f2 = KeyEvent::new(KeyCode::F(2), KeyModifiers::NONE);
        assert_eq!(map_key(InputMode::Dialog, ctrl_s), Some(Action::SubmitInput));
        assert_eq!(map_key(InputMode::Dialog, enter), Some(Action::InputChar('\n')));
        assert_eq!(map_key(InputMode::Dialog, f2), Some(Action::CycleDialogMode));
    }

    #[test]
    fn login_mode_tab_switches_field() {
        let key = KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(map_key(InputMode::Login, key), Some(Action::NextField));
    }

    #[test]
    fn left_click_maps_to_click_action() {
        let mouse = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 4,
            row: 9,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(map_mouse(mouse), Some(Action::Click { column: 4, row: 9 }));
    }
}
